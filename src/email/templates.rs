use crate::models::{NotificationRequest, UpdateType};
use crate::notify::format_status;

const HEADER_STYLE: &str = "background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); padding: 30px; border-radius: 10px 10px 0 0; text-align: center;";
const BODY_STYLE: &str = "background: #f8f9fa; padding: 30px; border-radius: 0 0 10px 10px; border: 1px solid #e9ecef;";
const TEXT_STYLE: &str = "font-size: 16px; color: #333; margin-bottom: 20px;";

/// Subject and HTML body for a project update email.
pub fn render_project_update(req: &NotificationRequest, site_url: &str) -> (String, String) {
    let project = escape(&req.project_name);
    let client = escape(&req.client_name);
    let dashboard = format!("{}/dashboard", site_url.trim_end_matches('/'));

    match req.update_type {
        UpdateType::Status => (
            format!("Project Status Update: {}", req.project_name),
            render_status(&client, &project, req, &dashboard),
        ),
        UpdateType::Progress => (
            format!("Project Progress Update: {}", req.project_name),
            render_progress(&client, &project, req, &dashboard),
        ),
        UpdateType::General => (
            format!("Project Update: {}", req.project_name),
            render_general(&client, &project, req, &dashboard),
        ),
    }
}

fn render_status(client: &str, project: &str, req: &NotificationRequest, dashboard: &str) -> String {
    let old = escape(&format_status(req.old_value.as_deref().unwrap_or_default()));
    let new = escape(&format_status(req.new_value.as_deref().unwrap_or_default()));
    let content = format!(
        r#"<p style="{TEXT_STYLE}">Great news! We've updated the status of your project <strong>"{project}"</strong>.</p>
    <div style="background: white; padding: 20px; border-radius: 8px; border-left: 4px solid #667eea; margin: 20px 0;">
        <p style="margin: 0; color: #666; font-size: 14px;">Status changed from:</p>
        <p style="margin: 5px 0; font-size: 16px; color: #dc3545;">{old}</p>
        <p style="margin: 0; color: #666; font-size: 14px;">to:</p>
        <p style="margin: 5px 0; font-size: 16px; color: #28a745; font-weight: bold;">{new}</p>
    </div>
    {quote}
    <p style="{TEXT_STYLE}">You can view the full project details and progress in your client dashboard.</p>"#,
        quote = quoted_message(req.message.as_deref()),
    );
    layout("Project Status Update", client, &content, dashboard)
}

fn render_progress(client: &str, project: &str, req: &NotificationRequest, dashboard: &str) -> String {
    let old = escape(req.old_value.as_deref().unwrap_or_default());
    let new = escape(req.new_value.as_deref().unwrap_or_default());
    let width = req
        .new_value
        .as_deref()
        .and_then(|v| v.trim().parse::<i32>().ok())
        .unwrap_or(0)
        .clamp(0, 100);
    let content = format!(
        r#"<p style="{TEXT_STYLE}">We've made progress on your project <strong>"{project}"</strong>!</p>
    <div style="background: white; padding: 20px; border-radius: 8px; border-left: 4px solid #28a745; margin: 20px 0;">
        <p style="margin: 0; color: #666; font-size: 14px;">Progress updated from:</p>
        <p style="margin: 5px 0; font-size: 16px; color: #666;">{old}%</p>
        <p style="margin: 0; color: #666; font-size: 14px;">to:</p>
        <p style="margin: 5px 0; font-size: 18px; color: #28a745; font-weight: bold;">{new}%</p>
    </div>
    <div style="background: #e8f5e8; border-radius: 10px; padding: 4px; margin: 20px 0;">
        <div style="background: #28a745; height: 20px; border-radius: 6px; width: {width}%;"></div>
    </div>
    {quote}"#,
        quote = quoted_message(req.message.as_deref()),
    );
    layout("Project Progress Update", client, &content, dashboard)
}

fn render_general(client: &str, project: &str, req: &NotificationRequest, dashboard: &str) -> String {
    let message = match req.message.as_deref() {
        Some(m) if !m.is_empty() => format!(
            r#"<div style="background: white; padding: 20px; border-radius: 8px; border-left: 4px solid #667eea; margin: 20px 0;">
        <p style="margin: 0; color: #333; font-size: 16px;">{}</p>
    </div>"#,
            escape(m)
        ),
        _ => String::new(),
    };
    let content = format!(
        r#"<p style="{TEXT_STYLE}">We have an update regarding your project <strong>"{project}"</strong>.</p>
    {message}"#
    );
    layout("Project Update", client, &content, dashboard)
}

fn quoted_message(message: Option<&str>) -> String {
    match message {
        Some(m) if !m.is_empty() => format!(
            r#"<div style="background: #e3f2fd; padding: 15px; border-radius: 8px; margin: 20px 0;">
        <p style="margin: 0; color: #1565c0; font-style: italic;">"{}"</p>
    </div>"#,
            escape(m)
        ),
        _ => String::new(),
    }
}

fn layout(title: &str, client: &str, content: &str, dashboard: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
<div style="{HEADER_STYLE}">
    <h1 style="color: white; margin: 0; font-size: 24px;">{title}</h1>
</div>
<div style="{BODY_STYLE}">
    <p style="{TEXT_STYLE}">Hi {client},</p>
    {content}
    <div style="text-align: center; margin: 30px 0;">
        <a href="{dashboard}" style="background: #667eea; color: white; padding: 12px 30px; text-decoration: none; border-radius: 6px; font-weight: bold; display: inline-block;">View Project Dashboard</a>
    </div>
    <hr style="border: none; border-top: 1px solid #e9ecef; margin: 30px 0;">
    <p style="font-size: 14px; color: #666; margin: 0;">Best regards,<br>Your Project Team</p>
</div>
</body>
</html>"#
    )
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
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
