use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex_lite::Regex;
use serde::Serialize;

use crate::error::AppError;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("email pattern compiles")
});

/// `0` + 9 digits (local), or `+` + country code + subscriber number (9-14 digits).
static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0\d{9}|\+[1-9]\d{8,13})$").expect("phone pattern compiles")
});

const MAX_NAME: usize = 100;
const MAX_EMAIL: usize = 190;
const MAX_PHONE: usize = 20;
const MAX_ID_NUMBER: usize = 20;
const MAX_DATE: usize = 10;
const MAX_GENDER: usize = 30;
const MAX_ADDRESS: usize = 255;
const MAX_PROGRAM: usize = 150;
const MAX_YEAR: usize = 4;
const MAX_LONG_TEXT: usize = 2000;
const MAX_EDUCATION: usize = 100;
const MAX_SCHOOL: usize = 150;
const MAX_URL: usize = 255;

const MIN_BIRTH_YEAR: i32 = 1900;

/// Earliest accepted graduation year.
const MIN_GRADUATION_YEAR: i32 = 1950;

/// Text inputs of the application form, by their form field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextField {
    FirstName,
    LastName,
    Email,
    Phone,
    IdNumber,
    Dob,
    Gender,
    Address,
    Program,
    StartDate,
    Motivation,
    Education,
    School,
    GraduationYear,
    Portfolio,
    Experience,
}

/// Checkbox inputs. Presence means checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentField {
    Popia,
    Marketing,
    Accuracy,
}

impl TextField {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "firstName" => Self::FirstName,
            "lastName" => Self::LastName,
            "email" => Self::Email,
            "phone" => Self::Phone,
            "idNumber" => Self::IdNumber,
            "dob" => Self::Dob,
            "gender" => Self::Gender,
            "address" => Self::Address,
            "program" => Self::Program,
            "startDate" => Self::StartDate,
            "motivation" => Self::Motivation,
            "education" => Self::Education,
            "school" => Self::School,
            "graduationYear" => Self::GraduationYear,
            "portfolio" => Self::Portfolio,
            "experience" => Self::Experience,
            _ => return None,
        })
    }
}

impl ConsentField {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "popiaConsent" => Self::Popia,
            "marketingConsent" => Self::Marketing,
            "accuracyConsent" => Self::Accuracy,
            _ => return None,
        })
    }
}

/// Form text exactly as received. A field that never arrived stays `None`.
#[derive(Debug, Default, Clone)]
pub struct RawApplicationFields {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    id_number: Option<String>,
    dob: Option<String>,
    gender: Option<String>,
    address: Option<String>,
    program: Option<String>,
    start_date: Option<String>,
    motivation: Option<String>,
    education: Option<String>,
    school: Option<String>,
    graduation_year: Option<String>,
    portfolio: Option<String>,
    experience: Option<String>,
    popia_consent: bool,
    marketing_consent: bool,
    accuracy_consent: bool,
}

impl RawApplicationFields {
    fn slot(&mut self, field: TextField) -> &mut Option<String> {
        match field {
            TextField::FirstName => &mut self.first_name,
            TextField::LastName => &mut self.last_name,
            TextField::Email => &mut self.email,
            TextField::Phone => &mut self.phone,
            TextField::IdNumber => &mut self.id_number,
            TextField::Dob => &mut self.dob,
            TextField::Gender => &mut self.gender,
            TextField::Address => &mut self.address,
            TextField::Program => &mut self.program,
            TextField::StartDate => &mut self.start_date,
            TextField::Motivation => &mut self.motivation,
            TextField::Education => &mut self.education,
            TextField::School => &mut self.school,
            TextField::GraduationYear => &mut self.graduation_year,
            TextField::Portfolio => &mut self.portfolio,
            TextField::Experience => &mut self.experience,
        }
    }

    /// Record a text part. Repeated fields are a malformed submission.
    pub fn set_text(&mut self, field: TextField, value: String) -> Result<(), AppError> {
        let slot = self.slot(field);
        if slot.is_some() {
            return Err(AppError::Validation("Malformed form submission.".into()));
        }
        *slot = Some(value);
        Ok(())
    }

    /// Record a checkbox part. Its value is ignored.
    pub fn check(&mut self, field: ConsentField) -> Result<(), AppError> {
        let checked = match field {
            ConsentField::Popia => &mut self.popia_consent,
            ConsentField::Marketing => &mut self.marketing_consent,
            ConsentField::Accuracy => &mut self.accuracy_consent,
        };
        if *checked {
            return Err(AppError::Validation("Malformed form submission.".into()));
        }
        *checked = true;
        Ok(())
    }

    /// Normalize and validate. Nothing has been written when this fails.
    pub fn normalize(self, rules: &FormRules) -> Result<ApplicationForm, AppError> {
        let first_name = clean(self.first_name, MAX_NAME);
        let last_name = clean(self.last_name, MAX_NAME);
        if first_name.is_empty() || last_name.is_empty() {
            return Err(invalid("Please enter your full name."));
        }

        // Too long is rejected, not truncated: a cut address may still parse.
        let email = collapse(self.email);
        if email.chars().count() > MAX_EMAIL || !EMAIL_RE.is_match(&email) {
            return Err(invalid("Please enter a valid email address."));
        }

        let phone = clean(self.phone, MAX_PHONE);
        let dialable: String = phone
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();
        if !PHONE_RE.is_match(&dialable) {
            return Err(invalid("Please enter a valid phone number."));
        }

        let id_number = clean(self.id_number, MAX_ID_NUMBER);
        if id_number.is_empty() || !id_number.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(invalid("Please enter your ID or passport number."));
        }

        let dob = clean(self.dob, MAX_DATE);
        let date_of_birth = parse_birth_date(&dob, rules.today)
            .ok_or_else(|| invalid("Please enter a valid date of birth."))?;

        let program = clean(self.program, MAX_PROGRAM);
        if program.is_empty() {
            return Err(invalid("Please choose a program."));
        }

        let start_date = clean(self.start_date, MAX_YEAR);
        let start_year = parse_year(&start_date)
            .filter(|y| rules.start_years.contains(y))
            .ok_or_else(|| invalid("Please choose a valid start year."))?;

        let graduation = clean(self.graduation_year, MAX_YEAR);
        let graduation_year = if graduation.is_empty() {
            None
        } else {
            let latest = rules.today.year() + 1;
            Some(
                parse_year(&graduation)
                    .filter(|y| (MIN_GRADUATION_YEAR..=latest).contains(y))
                    .ok_or_else(|| invalid("Please enter a valid graduation year."))?,
            )
        };

        let portfolio_url = clean(self.portfolio, MAX_URL);
        if !portfolio_url.is_empty()
            && !(portfolio_url.starts_with("https://") || portfolio_url.starts_with("http://"))
        {
            return Err(invalid(
                "Portfolio link must start with http:// or https://.",
            ));
        }

        if !self.popia_consent || !self.accuracy_consent {
            return Err(invalid("Please accept the required consent checkboxes."));
        }

        Ok(ApplicationForm {
            applicant: ApplicantDetails {
                first_name,
                last_name,
                email,
                phone: dialable,
                id_number,
                date_of_birth,
                gender: clean(self.gender, MAX_GENDER),
                address: clean(self.address, MAX_ADDRESS),
            },
            program,
            start_year,
            motivation: clean(self.motivation, MAX_LONG_TEXT),
            education: EducationDetails {
                level: clean(self.education, MAX_EDUCATION),
                institution: clean(self.school, MAX_SCHOOL),
                graduation_year,
                portfolio_url,
                experience: clean(self.experience, MAX_LONG_TEXT),
            },
            consents: Consents {
                popia: self.popia_consent,
                marketing: self.marketing_consent,
                accuracy: self.accuracy_consent,
            },
        })
    }
}

/// Request-independent inputs to validation.
#[derive(Debug, Clone)]
pub struct FormRules {
    /// Allow-list for `startDate`.
    pub start_years: Vec<i32>,
    /// Upper bound for birth dates.
    pub today: NaiveDate,
}

/// A validated application, ready to persist.
#[derive(Debug, Clone)]
pub struct ApplicationForm {
    pub applicant: ApplicantDetails,
    pub program: String,
    pub start_year: i32,
    pub motivation: String,
    pub education: EducationDetails,
    pub consents: Consents,
}

impl ApplicationForm {
    /// January 1st of the intake year; the program key stored with the name.
    pub fn program_start_date(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.start_year, 1, 1).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct ApplicantDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Separators removed.
    pub phone: String,
    pub id_number: String,
    pub date_of_birth: NaiveDate,
    pub gender: String,
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct EducationDetails {
    pub level: String,
    pub institution: String,
    pub graduation_year: Option<i32>,
    pub portfolio_url: String,
    pub experience: String,
}

#[derive(Debug, Clone, Copy)]
pub struct Consents {
    pub popia: bool,
    pub marketing: bool,
    pub accuracy: bool,
}

/// Body returned to JSON clients after a successful submission.
#[derive(Serialize, utoipa::ToSchema)]
pub struct SubmissionResponse {
    #[schema(example = true)]
    pub success: bool,
    #[schema(example = "Application submitted successfully.")]
    pub message: String,
}

fn invalid(message: &str) -> AppError {
    AppError::Validation(message.to_string())
}

/// Trim, collapse internal whitespace (including line breaks) to single
/// spaces, then cap at `max` characters.
pub fn clean(value: Option<String>, max: usize) -> String {
    collapse(value)
        .chars()
        .take(max)
        .collect::<String>()
        .trim_end()
        .to_string()
}

fn collapse(value: Option<String>) -> String {
    value
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_year(value: &str) -> Option<i32> {
    if value.len() != 4 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// `YYYY-MM-DD`, a real calendar date, not after `today`.
fn parse_birth_date(value: &str, today: NaiveDate) -> Option<NaiveDate> {
    let bytes = value.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    (date.year() >= MIN_BIRTH_YEAR && date <= today).then_some(date)
}
