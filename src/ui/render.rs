use std::fmt::Write as _;

use crate::models::StudentDetail;
use crate::ui::form::{FormState, RegistrationForm};
use crate::ui::view::{Page, ViewModel};
use crate::validation::{normalize_phone, Field};

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// `1234567890` -> `123-456-7890`; anything else is shown as its digits
pub fn format_phone(number: &str) -> String {
    let digits = normalize_phone(number);
    if digits.len() == 10 {
        format!("{}-{}-{}", &digits[..3], &digits[3..6], &digits[6..])
    } else {
        digits
    }
}

fn layout(title: &str, body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title}</title>
<link rel="stylesheet" href="/static/styles.css">
</head>
<body>
<div id="app">
{body}
</div>
</body>
</html>
"#,
        title = escape_html(title),
        body = body
    )
}

fn notice_html(notice: Option<&str>) -> String {
    notice
        .map(|n| format!(r#"<div class="notice">{}</div>"#, escape_html(n)))
        .unwrap_or_default()
}

/// Render whichever page the view-model is on
pub fn render_page(vm: &ViewModel, form: &RegistrationForm) -> String {
    match (vm.current_page, vm.student.as_ref()) {
        (Page::Registration, _) => render_registration(form),
        (Page::StudentCard, Some(student)) => render_student_card(student),
        _ => render_student_list(vm),
    }
}

pub fn render_student_list(vm: &ViewModel) -> String {
    let or_dash = |v: Option<&str>| v.map(escape_html).unwrap_or_else(|| "-".to_string());

    let mut rows = String::new();
    for s in &vm.students {
        let _ = write!(
            rows,
            r#"<tr>
<td class="student-name">{name}</td>
<td>{company}</td>
<td>{phone1}</td>
<td>{phone2}</td>
<td>{email}</td>
<td><a class="btn-view-card" href="/students/{id}">View Card</a></td>
</tr>
"#,
            name = escape_html(&s.name),
            company = or_dash(s.company.as_deref()),
            phone1 = escape_html(&s.phone1),
            phone2 = or_dash(s.phone2.as_deref()),
            email = escape_html(&s.email),
            id = s.id,
        );
    }

    let content = if vm.students.is_empty() {
        r#"<div class="empty-state">
<h2>No Students Yet</h2>
<p>Click "New Registration" to add your first student</p>
</div>"#
            .to_string()
    } else {
        format!(
            r#"<div class="students-table-container">
<table class="students-table">
<thead><tr><th>Name</th><th>Company</th><th>Phone 1</th><th>Phone 2</th><th>Email</th><th>Action</th></tr></thead>
<tbody>
{rows}</tbody>
</table>
</div>"#
        )
    };

    let body = format!(
        r#"<div class="page-student-list">
{notice}
<div class="list-header">
<div class="header-left">
<h1>Student List</h1>
<div class="student-count">Total Registered: <span class="count-badge">{count}</span></div>
</div>
<a class="btn-new-registration" href="/register">New Registration</a>
</div>
{content}
</div>"#,
        notice = notice_html(vm.notice.as_deref()),
        count = vm.students.len(),
    );
    layout("Student List", &body)
}

fn input_group(
    form: &RegistrationForm,
    field: Field,
    label: &str,
    input_type: &str,
    value: &str,
    placeholder: &str,
) -> String {
    let error = form.errors().and_then(|e| e.message_for(field));
    let required = match field {
        Field::Name | Field::Phone1 | Field::Email => true,
        Field::Company => form.rules().require_company,
        _ => false,
    };
    format!(
        r#"<div class="form-group">
<label for="{id}">{label}{star}</label>
<input type="{input_type}" id="{id}" name="{id}" value="{value}" placeholder="{placeholder}"{req}{class}>
<div class="error-message{show}" id="{id}-error">{error}</div>
</div>
"#,
        id = field.as_str(),
        label = label,
        star = if required { " *" } else { "" },
        input_type = input_type,
        value = escape_html(value),
        placeholder = placeholder,
        req = if required { " required" } else { "" },
        class = if error.is_some() { r#" class="error""# } else { "" },
        show = if error.is_some() { " show" } else { "" },
        error = error.map(escape_html).unwrap_or_default(),
    )
}

pub fn render_registration(form: &RegistrationForm) -> String {
    let fields = form.fields();
    let photo_error = form
        .errors()
        .and_then(|e| e.message_for(Field::Photo))
        .map(escape_html);

    // browsers never refill a file input, so a kept photo has to be chosen again
    let preview = match (form.preview_data_url(), form.photo()) {
        (Some(url), Some(photo)) => format!(
            r#"<img src="{}" alt="Preview" class="photo-preview">
<p class="photo-selected">{} was selected, choose it again to submit</p>"#,
            escape_html(&url),
            escape_html(photo.file_name.as_deref().unwrap_or("Photo")),
        ),
        _ => String::new(),
    };

    let (submit_label, disabled) = match form.state() {
        FormState::Submitting => ("Submitting...", " disabled"),
        _ => ("Submit", ""),
    };

    let mut groups = String::new();
    groups.push_str(&input_group(form, Field::Name, "Full Name", "text", &fields.name, "Enter student name"));
    groups.push_str(&input_group(
        form,
        Field::Company,
        "Company",
        "text",
        fields.company.as_deref().unwrap_or(""),
        "Enter company name",
    ));
    groups.push_str(&input_group(form, Field::Phone1, "Phone 1", "tel", &fields.phone1, "Enter phone number"));
    groups.push_str(&input_group(
        form,
        Field::Phone2,
        "Phone 2",
        "tel",
        fields.phone2.as_deref().unwrap_or(""),
        "Enter second phone number (optional)",
    ));
    groups.push_str(&input_group(form, Field::Email, "Email", "email", &fields.email, "Enter email address"));

    let body = format!(
        r#"<div class="page-registration">
<div class="form-container">
<h1>Student Registration</h1>
{notice}
<form id="registrationForm" method="post" action="/register" enctype="multipart/form-data" novalidate data-require-company="{require_company}">
{groups}<div class="photo-upload-container">
<label class="photo-upload-label" for="photo">Student Photo *</label>
<div class="photo-input-wrapper">
<input type="file" id="photo" name="photo" accept="image/png,image/jpeg,image/gif" required>
<label for="photo" class="photo-upload-button">Click to upload or drag &amp; drop<br><small>PNG, JPG, GIF (Max 5MB)</small></label>
</div>
<div class="photo-preview-container" id="photoPreviewContainer">{preview}</div>
<div class="error-message{photo_show}" id="photo-error">{photo_error}</div>
</div>
<div class="form-actions">
<button type="submit" class="btn-submit"{disabled}>{submit_label}</button>
<a class="btn-cancel" href="/">Back</a>
</div>
</form>
</div>
</div>
<script src="/static/app.js" defer></script>"#,
        notice = notice_html(form.notice()),
        require_company = form.rules().require_company,
        photo_show = if photo_error.is_some() { " show" } else { "" },
        photo_error = photo_error.unwrap_or_default(),
    );
    layout("Student Registration", &body)
}

pub fn render_student_card(student: &StudentDetail) -> String {
    let company = student
        .company
        .as_deref()
        .map(|c| format!(r#"<div class="card-company">{}</div>"#, escape_html(c)))
        .unwrap_or_default();
    let phone2 = student
        .phone2
        .as_deref()
        .map(|p| format!(r#"<span class="phone2">{}</span>"#, escape_html(&format_phone(p))))
        .unwrap_or_default();

    let body = format!(
        r#"<div class="page-student-card">
<div class="card-wrapper">
<div class="student-card-horizontal">
<div class="avatar-column">
<img src="{avatar}" alt="{name}" class="card-avatar">
</div>
<div class="info-column">
<div class="card-name">{name}</div>
{company}
<div class="card-info-row"><span class="phone1">{phone1}</span>{phone2}</div>
<div class="card-info-row"><span class="email">{email}</span></div>
</div>
</div>
</div>
<div class="card-actions">
<a class="primary-btn" href="/">Back</a>
</div>
</div>"#,
        avatar = escape_html(&student.avatar_url),
        name = escape_html(&student.name),
        phone1 = escape_html(&format_phone(&student.phone1)),
        email = escape_html(&student.email),
    );
    layout(&student.name, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PhotoUpload, StudentFields, StudentSummary};
    use crate::ui::form::FormEvent;
    use crate::validation::RuleSet;
    use bytes::Bytes;

    fn detail() -> StudentDetail {
        StudentDetail {
            id: 4,
            name: "Ada <Lovelace>".to_string(),
            company: None,
            phone1: "1234567890".to_string(),
            phone2: Some("(098) 765-4321".to_string()),
            email: "ada@engines.uk".to_string(),
            avatar: None,
            avatar_mime: None,
            avatar_url: "https://api.dicebear.com/7.x/personas/svg?seed=Ada%20%3CLovelace%3E".to_string(),
            created_at: "2024-01-01T00:00:00Z".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_format_phone() {
        assert_eq!(format_phone("1234567890"), "123-456-7890");
        assert_eq!(format_phone("(123) 456 7890"), "123-456-7890");
        assert_eq!(format_phone("12345"), "12345");
        assert_eq!(format_phone(""), "");
    }

    #[test]
    fn test_list_empty_and_rows() {
        let html = render_student_list(&ViewModel::default());
        assert!(html.contains("No Students Yet"));
        assert!(html.contains(r#"<span class="count-badge">0</span>"#));

        let vm = ViewModel {
            students: vec![StudentSummary {
                id: 12,
                name: "Jo".to_string(),
                company: None,
                phone1: "1234567890".to_string(),
                phone2: None,
                email: "jo@x.co".to_string(),
                has_avatar: true,
                created_at: "2024-01-01T00:00:00Z".to_string(),
            }],
            notice: Some("Student not found".to_string()),
            ..Default::default()
        };
        let html = render_student_list(&vm);
        assert!(html.contains(r#"href="/students/12""#));
        assert!(html.contains("<td>-</td>"));
        assert!(html.contains(r#"<div class="notice">Student not found</div>"#));
        assert!(!html.contains("No Students Yet"));
    }

    #[test]
    fn test_card_escapes_and_formats() {
        let html = render_student_card(&detail());
        assert!(html.contains("Ada &lt;Lovelace&gt;"));
        assert!(!html.contains("<Lovelace>"));
        assert!(html.contains("123-456-7890"));
        assert!(html.contains("098-765-4321"));
        assert!(html.contains("https://api.dicebear.com/7.x/personas/svg?seed="));
        assert!(!html.contains("card-company"));
    }

    #[test]
    fn test_registration_keeps_values_and_errors() {
        let mut form = RegistrationForm::new(RuleSet::default());
        form.handle(FormEvent::Edited(StudentFields {
            name: "J\"o".to_string(),
            company: None,
            phone1: "12".to_string(),
            phone2: None,
            email: "jo@x.co".to_string(),
        }));
        form.handle(FormEvent::FileChosen(PhotoUpload {
            bytes: Bytes::from_static(b"GIF89a"),
            content_type: "image/gif".to_string(),
            file_name: None,
        }));
        form.handle(FormEvent::Submit);

        let html = render_registration(&form);
        assert!(html.contains(r#"value="J&quot;o""#));
        assert!(html.contains("Phone 1 must be exactly 10 digits"));
        assert!(html.contains("Name must contain only letters and spaces"));
        assert!(html.contains("data:image/gif;base64,R0lGODlh"));
        assert!(html.contains("Photo was selected"));
        assert!(html.contains(r#"value="jo@x.co""#));
    }

    #[test]
    fn test_render_page_dispatch() {
        let form = RegistrationForm::new(RuleSet::default());
        let vm = ViewModel::default().navigate(Page::Registration, None);
        assert!(render_page(&vm, &form).contains("Student Registration"));

        let mut vm = ViewModel::default().navigate(Page::StudentCard, Some(4));
        vm.student = Some(detail());
        assert!(render_page(&vm, &form).contains("card-avatar"));

        let vm = ViewModel::default();
        assert!(render_page(&vm, &form).contains("Student List"));
    }

    #[test]
    fn test_registration_wires_browser_script() {
        let html = render_registration(&RegistrationForm::new(RuleSet {
            require_company: true,
        }));
        assert!(html.contains(r#"<script src="/static/app.js" defer></script>"#));
        assert!(html.contains(r#"data-require-company="true""#));
        assert!(html.contains(r#"id="photoPreviewContainer""#));
        assert!(html.contains(r#"class="photo-upload-button""#));
    }
}
