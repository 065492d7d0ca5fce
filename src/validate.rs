use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::students::StudentAction;

static USERNAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("username pattern"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("email pattern"));
static PHONE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^98[0-9]{8}$").expect("phone pattern"));

const MIN_AGE_YEARS: u32 = 16;

/// Checks an update submission against the fixed rule order and returns the
/// first failing rule's message, or `None` when every rule passes. The order
/// is an observable contract: presence of every field first, then username,
/// gender, email and phone grammar, then the date-of-birth rules.
pub fn validate_update(form: &StudentAction) -> Option<String> {
    if is_blank(&form.first_name) {
        return Some("First name is required.".to_string());
    }
    if is_blank(&form.last_name) {
        return Some("Last name is required.".to_string());
    }
    if is_blank(&form.username) {
        return Some("Username is required.".to_string());
    }
    if is_blank(&form.dob) {
        return Some("Date of birth is required.".to_string());
    }
    if is_blank(&form.gender) {
        return Some("Gender is required.".to_string());
    }
    if is_blank(&form.email) {
        return Some("Email is required.".to_string());
    }
    if is_blank(&form.phone_number) {
        return Some("Phone number is required.".to_string());
    }
    if is_blank(&form.subject) {
        return Some("Subject is required.".to_string());
    }

    let username = form.username.as_deref().unwrap_or("");
    if !USERNAME_RE.is_match(username) {
        return Some(
            "Username must start with a letter and contain only letters and numbers.".to_string(),
        );
    }

    let gender = form.gender.as_deref().unwrap_or("");
    if gender != "male" && gender != "female" {
        return Some("Gender must be 'male' or 'female'.".to_string());
    }

    let email = form.email.as_deref().unwrap_or("");
    if !EMAIL_RE.is_match(email) {
        return Some("Invalid email format.".to_string());
    }

    let number = form.phone_number.as_deref().unwrap_or("");
    if !PHONE_RE.is_match(number) {
        return Some("Phone number must be 10 digits and start with 98.".to_string());
    }

    let dob = match NaiveDate::parse_from_str(form.dob.as_deref().unwrap_or(""), "%Y-%m-%d") {
        Ok(dob) => dob,
        Err(_) => return Some("Invalid date format. Please use YYYY-MM-DD.".to_string()),
    };
    if !is_age_at_least_16(dob, Utc::now().date_naive()) {
        return Some("You must be at least 16 years old.".to_string());
    }

    None
}

/// Inclusive boundary: a date of birth exactly 16 years before `today`
/// passes. Future dates of birth never do.
pub(crate) fn is_age_at_least_16(dob: NaiveDate, today: NaiveDate) -> bool {
    today
        .years_since(dob)
        .map_or(false, |age| age >= MIN_AGE_YEARS)
}

fn is_blank(value: &Option<String>) -> bool {
    match value {
        Some(v) => v.is_empty(),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Months;

    fn valid_form() -> StudentAction {
        StudentAction {
            action: "update".to_string(),
            student_id: 42,
            first_name: Some("Anita".to_string()),
            last_name: Some("Shrestha".to_string()),
            username: Some("anita01".to_string()),
            dob: Some("2000-01-01".to_string()),
            gender: Some("female".to_string()),
            email: Some("anita@college.edu.np".to_string()),
            phone_number: Some("9812345678".to_string()),
            subject: Some("Computing".to_string()),
            image: None,
        }
    }

    #[test]
    fn valid_submission_passes() {
        assert_eq!(validate_update(&valid_form()), None);
    }

    #[test]
    fn first_failing_rule_wins() {
        // Two simultaneous violations report only the earlier rule.
        let mut form = valid_form();
        form.first_name = Some(String::new());
        form.email = Some("not-an-email".to_string());
        assert_eq!(
            validate_update(&form).as_deref(),
            Some("First name is required.")
        );
    }

    #[test]
    fn missing_fields_report_in_order() {
        let mut form = valid_form();
        form.subject = None;
        assert_eq!(validate_update(&form).as_deref(), Some("Subject is required."));

        form.dob = Some(String::new());
        assert_eq!(
            validate_update(&form).as_deref(),
            Some("Date of birth is required.")
        );
    }

    #[test]
    fn username_must_start_with_letter() {
        let mut form = valid_form();
        form.username = Some("9anita".to_string());
        assert_eq!(
            validate_update(&form).as_deref(),
            Some("Username must start with a letter and contain only letters and numbers.")
        );

        form.username = Some("ani_ta".to_string());
        assert!(validate_update(&form).is_some());
    }

    #[test]
    fn gender_match_is_case_sensitive() {
        let mut form = valid_form();
        form.gender = Some("Female".to_string());
        assert_eq!(
            validate_update(&form).as_deref(),
            Some("Gender must be 'male' or 'female'.")
        );

        form.gender = Some("male".to_string());
        assert_eq!(validate_update(&form), None);
    }

    #[test]
    fn email_grammar_is_enforced() {
        let mut form = valid_form();
        form.email = Some("anita@college".to_string());
        assert_eq!(validate_update(&form).as_deref(), Some("Invalid email format."));
    }

    #[test]
    fn phone_must_be_ten_digits_starting_98() {
        let mut form = valid_form();
        form.phone_number = Some("1234567890".to_string());
        assert_eq!(
            validate_update(&form).as_deref(),
            Some("Phone number must be 10 digits and start with 98.")
        );

        form.phone_number = Some("98123456789".to_string());
        assert!(validate_update(&form).is_some());

        form.phone_number = Some("9812345678".to_string());
        assert_eq!(validate_update(&form), None);
    }

    #[test]
    fn unparseable_dob_is_rejected() {
        let mut form = valid_form();
        form.dob = Some("01-01-2000".to_string());
        assert_eq!(
            validate_update(&form).as_deref(),
            Some("Invalid date format. Please use YYYY-MM-DD.")
        );
    }

    #[test]
    fn fifteen_year_old_is_rejected() {
        let today = Utc::now().date_naive();
        let dob = today.checked_sub_months(Months::new(12 * 15)).unwrap();
        let mut form = valid_form();
        form.dob = Some(dob.format("%Y-%m-%d").to_string());
        assert_eq!(
            validate_update(&form).as_deref(),
            Some("You must be at least 16 years old.")
        );
    }

    #[test]
    fn sixteen_years_exactly_is_accepted() {
        let today = Utc::now().date_naive();
        let dob = today.checked_sub_months(Months::new(12 * 16)).unwrap();
        let mut form = valid_form();
        form.dob = Some(dob.format("%Y-%m-%d").to_string());
        assert_eq!(validate_update(&form), None);
    }

    #[test]
    fn age_boundary_is_inclusive() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert!(is_age_at_least_16(
            NaiveDate::from_ymd_opt(2008, 5, 10).unwrap(),
            today
        ));
        assert!(!is_age_at_least_16(
            NaiveDate::from_ymd_opt(2008, 5, 11).unwrap(),
            today
        ));
        assert!(is_age_at_least_16(
            NaiveDate::from_ymd_opt(1990, 1, 1).unwrap(),
            today
        ));
    }

    #[test]
    fn future_dob_is_rejected() {
        let today = NaiveDate::from_ymd_opt(2024, 5, 10).unwrap();
        assert!(!is_age_at_least_16(
            NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            today
        ));
    }
}
