// src/render.rs
//! Period label, subject line and the HTML body of the digest email.

use chrono::{Datelike, Duration, NaiveDate};
use clap::ValueEnum;
use html_escape::{encode_double_quoted_attribute, encode_text};
use std::fmt::Write as _;

use crate::select::Bucket;
use crate::summarize::{BriefEntry, BriefSections};

const INTRO: &str = "This week's top financial developments: title, summary, and why they matter.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Period {
    Day,
    #[default]
    Week,
}

/// Week → Monday..Sunday containing `today`; day → `today`.
pub fn period_label(period: Period, today: NaiveDate) -> String {
    match period {
        Period::Day => today.format("%Y-%m-%d").to_string(),
        Period::Week => {
            let start = today - Duration::days(today.weekday().num_days_from_monday() as i64);
            let end = start + Duration::days(6);
            format!("{} to {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
        }
    }
}

pub fn subject_line(prefix: &str, period_label: &str) -> String {
    format!("{} Week of {}", prefix.trim(), period_label)
}

fn render_entry(out: &mut String, e: &BriefEntry) {
    let _ = write!(
        out,
        "<li style=\"margin-bottom:14px\"><a href=\"{}\"><strong>{}</strong></a>",
        encode_double_quoted_attribute(&e.url),
        encode_text(&e.title)
    );
    if !e.published.is_empty() {
        let _ = write!(
            out,
            " <span style=\"color:#777;font-size:12px\">({})</span>",
            encode_text(&e.published)
        );
    }
    let _ = write!(
        out,
        "<p style=\"margin:4px 0\">{}</p><p style=\"margin:4px 0;color:#444\"><em>{}</em></p></li>\n",
        encode_text(&e.summary),
        encode_text(&e.why)
    );
}

/// Returns `(subject, html)`. Every dynamic string is HTML-escaped.
pub fn render_email(
    sections: &BriefSections,
    period_label: &str,
    subject_prefix: &str,
) -> (String, String) {
    let subject = subject_line(subject_prefix, period_label);

    let mut html = String::with_capacity(4096);
    html.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">");
    let _ = write!(html, "<title>{}</title></head>\n", encode_text(&subject));
    html.push_str("<body style=\"font-family:Arial,Helvetica,sans-serif;max-width:680px;margin:auto\">\n");
    let _ = writeln!(html, "<h1 style=\"font-size:20px\">{}</h1>", encode_text(&subject));
    let _ = writeln!(html, "<p>{}</p>", encode_text(INTRO));
    let _ = writeln!(
        html,
        "<p style=\"color:#777\">Period: {}</p>",
        encode_text(period_label)
    );

    for b in Bucket::ALL {
        let _ = writeln!(html, "<h2 style=\"font-size:17px\">{}</h2>", encode_text(b.heading()));
        html.push_str("<ul style=\"padding-left:18px\">\n");
        for e in sections.get(b) {
            render_entry(&mut html, e);
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</body></html>\n");
    (subject, html)
}
