use crate::intake::PersistedApplication;
use crate::models::application::ApplicationForm;

/// Rendered email ready for a [`super::Mailer`].
#[derive(Debug, Clone)]
pub struct Email {
    pub subject: String,
    pub html: String,
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
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

pub fn verification_email(site_name: &str, first_name: &str, link: &str, ttl_minutes: i64) -> Email {
    let site = escape_html(site_name);
    let link = escape_html(link);
    Email {
        subject: format!("Confirm your email - {site_name}"),
        html: format!(
            "<p>Hi {name},</p>\
             <p>Thank you for applying to {site}. Please confirm your email address \
             to complete your application:</p>\
             <p><a href=\"{link}\">{link}</a></p>\
             <p>This link expires in {ttl_minutes} minutes and can be used once.</p>",
            name = escape_html(first_name),
        ),
    }
}

pub fn staff_summary(
    site_name: &str,
    form: &ApplicationForm,
    stored: &PersistedApplication,
) -> Email {
    let a = &form.applicant;
    let e = &form.education;
    let graduation = e
        .graduation_year
        .map(|y| y.to_string())
        .unwrap_or_default();
    let yes_no = |b: bool| if b { "yes" } else { "no" };

    let rows: [(&str, String); 18] = [
        ("Applicant ID", stored.applicant_id.to_string()),
        ("First name", a.first_name.clone()),
        ("Last name", a.last_name.clone()),
        ("Email", a.email.clone()),
        ("Phone", a.phone.clone()),
        ("ID number", a.id_number.clone()),
        ("Date of birth", a.date_of_birth.to_string()),
        ("Gender", a.gender.clone()),
        ("Address", a.address.clone()),
        ("Program", stored.program_name.clone()),
        ("Start year", stored.start_year.to_string()),
        ("Motivation", form.motivation.clone()),
        ("Education", e.level.clone()),
        ("School", e.institution.clone()),
        ("Graduation year", graduation),
        ("Portfolio", e.portfolio_url.clone()),
        ("Experience", e.experience.clone()),
        ("Marketing consent", yes_no(form.consents.marketing).to_string()),
    ];

    let mut html = String::from("<h2>New student application received</h2><table>");
    for (label, value) in rows {
        html.push_str(&format!(
            "<tr><th align=\"left\">{label}</th><td>{}</td></tr>",
            escape_html(&value)
        ));
    }
    html.push_str("</table><h3>Uploads</h3><ul>");
    for doc in &stored.documents {
        html.push_str(&format!(
            "<li>{}: {}/{}</li>",
            doc.file_type,
            stored.applicant_id,
            escape_html(&doc.stored_name)
        ));
    }
    html.push_str("</ul>");

    Email {
        subject: format!("New Application - {site_name}"),
        html,
    }
}

/// Short plain-text ping for the admissions phone.
pub fn whatsapp_text(form: &ApplicationForm, program: &str) -> String {
    let a = &form.applicant;
    format!(
        "New application\nName: {} {}\nProgram: {}\nPhone: {}\nEmail: {}",
        a.first_name, a.last_name, program, a.phone, a.email
    )
}
