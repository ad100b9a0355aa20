//! Requester-facing notices. Plain, short HTML; wording lives here only.

use chrono::{DateTime, Utc};

use crate::domain::types::Email;

#[derive(Debug, Clone)]
pub struct NoticeSettings {
    pub app_name: String,
    pub contact_email: String,
}

fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn date(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d").to_string()
}

impl NoticeSettings {
    fn wrap(&self, to: &str, subject: String, paragraphs: &[String]) -> Email {
        let body: String = paragraphs.iter().map(|p| format!("<p>{p}</p>")).collect();
        let contact = escape(&self.contact_email);
        let html = format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"></head><body>\
             <p>Hello,</p>{body}\
             <p>Questions? Write to <a href=\"mailto:{contact}\">{contact}</a>.</p>\
             <p>{} Support</p>\
             <hr><p style=\"font-size:0.8em;color:grey\">This message was sent automatically; please do not reply.</p>\
             </body></html>",
            escape(&self.app_name),
        );
        Email {
            to: to.to_owned(),
            subject,
            html,
        }
    }

    pub fn code_issued(&self, to: &str, code: &str, expires_at: DateTime<Utc>) -> Email {
        self.wrap(
            to,
            format!("Your {} offer code", self.app_name),
            &[
                "Here is your offer code:".to_owned(),
                format!("<strong>{}</strong>", escape(code)),
                format!("Redeem it before {}.", date(expires_at)),
            ],
        )
    }

    pub fn already_redeemed(&self, to: &str, last_claimed_at: DateTime<Utc>) -> Email {
        self.wrap(
            to,
            format!("You already received a {} offer code this year", self.app_name),
            &[
                format!(
                    "Our records show you received an offer code on {}.",
                    date(last_claimed_at)
                ),
                "Each address can receive one code per year; please try again once a year has passed since then."
                    .to_owned(),
            ],
        )
    }

    pub fn address_not_eligible(&self, to: &str) -> Email {
        self.wrap(
            to,
            format!("About your {} offer request", self.app_name),
            &[
                format!(
                    "The address {} does not qualify for this offer.",
                    escape(to)
                ),
                "The offer is limited to addresses issued by educational institutions.".to_owned(),
            ],
        )
    }

    pub fn technical_issue(&self, to: &str) -> Email {
        self.wrap(
            to,
            format!("About your {} offer request (technical issue)", self.app_name),
            &[
                "We could not issue your offer code because of a technical problem.".to_owned(),
                "The developers have been notified and will follow up; you may also try again later."
                    .to_owned(),
            ],
        )
    }
}
