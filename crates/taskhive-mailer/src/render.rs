//! Subject/body rendering for notification emails.

use taskhive_core::OutboundEmail;

/// Render a notification into a plain-text + HTML email for one recipient.
pub fn notification_email(
    to: &str,
    subject: &str,
    message: &str,
    link: Option<&str>,
) -> OutboundEmail {
    let text_body = match link {
        Some(link) => format!("{}\n\n{}", message, link),
        None => message.to_string(),
    };

    let html_message = escape_html(message);
    let html_body = match link {
        Some(link) => format!(
            "<html><body>\
             <p>{}</p>\
             <p><a href=\"{}\">Open in Taskhive</a></p>\
             </body></html>",
            html_message,
            escape_html(link)
        ),
        None => format!("<html><body><p>{}</p></body></html>", html_message),
    };

    OutboundEmail {
        to: to.to_string(),
        subject: subject.to_string(),
        text_body,
        html_body,
    }
}

/// Minimal HTML entity escaping for interpolated text.
fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
