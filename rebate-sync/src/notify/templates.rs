//! HTML message bodies for applicant notifications.

use serde::{Deserialize, Serialize};

use crate::models::RebateAmounts;

const SUBJECT_PREFIX: &str = "CleanBC Go Electric - Application #";
const PROGRAM_EMAIL: &str = "ZEVPrograms@gov.bc.ca";
const PROGRAM_SITE: &str = "https://goelectricbc.gov.bc.ca/";

/// Which message to send, with the values it needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum Notification {
    IndividualConfirm,
    /// Invitation for the spouse to complete a household application.
    SpouseInitial { initiator_email: String },
    HouseholdConfirm,
    /// Identity could not be verified; `reasons` is `;`-separated.
    Reject { reasons: String },
    Approved {
        applicant_full_name: String,
        amounts: RebateAmounts,
    },
    NotApproved { tax_year: i32 },
    HouseholdCancel,
    Cancel,
    Expired,
    ExpiryWarning,
}

/// A message ready for the mail relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub body: String,
    pub cc: Vec<String>,
}

impl Notification {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Notification::IndividualConfirm => "individual_confirm",
            Notification::SpouseInitial { .. } => "spouse_initial",
            Notification::HouseholdConfirm => "household_confirm",
            Notification::Reject { .. } => "reject",
            Notification::Approved { .. } => "approved",
            Notification::NotApproved { .. } => "not_approved",
            Notification::HouseholdCancel => "household_cancel",
            Notification::Cancel => "cancel",
            Notification::Expired => "expired",
            Notification::ExpiryWarning => "expiry_warning",
        }
    }

    fn subject_suffix(&self) -> &'static str {
        match self {
            Notification::Reject { .. } => " – Identity cannot be verified",
            Notification::Approved { .. } => " – Approved",
            Notification::NotApproved { .. } => " – Not Approved",
            Notification::HouseholdCancel | Notification::Cancel => " – Cancelled",
            Notification::Expired => " – Expired",
            Notification::ExpiryWarning => " – Will expire in 2 weeks",
            _ => "",
        }
    }

    /// Render subject, body and cc list for an application.
    ///
    /// `origin` is the public site origin used in the spouse invitation link.
    pub fn render(&self, application_id: &str, origin: &str) -> RenderedEmail {
        let cc = match self {
            Notification::SpouseInitial { initiator_email } => vec![initiator_email.clone()],
            _ => Vec::new(),
        };

        RenderedEmail {
            subject: format!("{}{}{}", SUBJECT_PREFIX, application_id, self.subject_suffix()),
            body: wrap(&self.body(application_id, origin)),
            cc,
        }
    }

    fn body(&self, application_id: &str, origin: &str) -> String {
        match self {
            Notification::IndividualConfirm => format!(
                "{GENERATED}\
                <p>Thank you.</p>\n\
                <p>We have received your application for a rebate under the CleanBC Go Electric \
                Passenger Vehicle Rebate program. You can expect to get an email reply with the \
                result of your application within 3 weeks. We are unable to speed up the \
                application process as our screening is automated.</p>\n\
                <p>Please keep this e-mail for your records.</p>\n\
                <p>Questions?</p>\n\
                <p>Please feel free to contact us at {PROGRAM_EMAIL}. Emails asking about the \
                status of your application will not be responded if it has not been 3 weeks since \
                your application was submitted. Please check your junk/spam folder for any missed \
                emails.</p>\n"
            ),
            Notification::SpouseInitial { .. } => format!(
                "<p>You are receiving this e-mail as you have been identified as a spouse under a \
                household rebate application for the CleanBC Go Electric Passenger Vehicle Rebate \
                program.</p>\n\
                <p>To finish the rebate application please click on the following link:</p>\n\
                <p>{origin}/household?q={application_id}</p>\n\
                <p><i>If you are not the intended person to receive this email, please contact the \
                CleanBC Go Electric Passenger Vehicle Rebate program at {PROGRAM_EMAIL}</i></p>\n\
                <p>Additional Questions?</p>\n\
                {CONTACT}"
            ),
            Notification::HouseholdConfirm => format!(
                "{GENERATED}\
                <p>Thank you.</p>\n\
                <p>We have now received all documentation for your application for a household \
                rebate under the CleanBC Go Electric Passenger Vehicle Rebate program. You can \
                expect to get an email reply with the result of your application within 3 \
                weeks.</p>\n\
                <p>Please keep this e-mail for your records.</p>\n\
                <p>Questions?</p>\n\
                {CONTACT}"
            ),
            Notification::Reject { reasons } => format!(
                "{GENERATED}\
                <p>Dear Applicant,</p>\n\
                <p>Your application cannot be approved due to the following issues:</p>\n\
                <ul>\n{items}</ul>\n\
                <b>You are encouraged to correct these issues and submit another application.</b>\n\
                <p>{PROGRAM_SITE}</p>\n\
                <p>Questions?</p>\n\
                {CONTACT}",
                items = reason_items(reasons)
            ),
            Notification::Approved {
                applicant_full_name,
                amounts,
            } => format!(
                "{GENERATED}\
                <p>Dear {applicant_full_name},</p>\n\
                <p>Your application has been approved for a maximum rebate amount of up to \
                ${zev_max}. The rebate options available to you are listed below. </p>\n\
                <p><b>Rebates for long-range ZEVs</b> (BEV, FCEV, ER-EV, and PHEV with an electric \
                range of 85 km or more):</p>\n\
                <ul>\n\
                <li>${zev_max} rebate for long-range ZEV purchase</li>\n\
                <li>${zev_max} rebate for long-range ZEV 36-month or longer lease term</li>\n\
                <li>${zev_mid} rebate for long-range ZEV 24-month lease term</li>\n\
                <li>${zev_min} rebate for long-range ZEV 12-month lease term</li>\n\
                </ul>\n\
                <p><b>Rebates for short-range PHEVs</b> (PHEV with an electric range of less than \
                85 km):</p>\n\
                <ul>\n\
                <li>${phev_max} rebate for short-range PHEV purchase</li>\n\
                <li>${phev_max} rebate for short-range PHEV 36-month or longer lease term</li>\n\
                <li>${phev_mid} rebate for short-range PHEV 24-month lease term</li>\n\
                <li>${phev_min} rebate for short-range PHEV 12-month lease term</li>\n\
                </ul>\n\
                <p>This rebate approval will expire one year from today’s date.</p>\n\
                <p>Next steps:</p>\n\
                <ol>\n\
                <li>Your approval is now linked to your driver’s licence. Bring your driver's \
                licence with you to a new car dealer in B.C.</li>\n\
                <li>Claim your rebate at the time of vehicle purchase to save money on your new \
                zero-emission vehicle!</li>\n\
                </ol>\n\
                <p><i>Please note: This e-mail confirms that you have been approved for a rebate \
                under the CleanBC Go Electric Light-Duty Vehicle program only. Accessing the rebate \
                is conditional on Program funds being available at the time of vehicle \
                purchase.</i></p>\n\
                <p>Questions?</p>\n\
                {CONTACT}",
                zev_max = amounts.zev_max,
                zev_mid = amounts.zev_mid,
                zev_min = amounts.zev_min,
                phev_max = amounts.phev_max,
                phev_mid = amounts.phev_mid,
                phev_min = amounts.phev_min,
            ),
            Notification::NotApproved { tax_year } => format!(
                "{GENERATED}\
                <p>Dear Applicant,</p>\n\
                <p>Your application has not been approved.</p>\n\
                <p>Some examples of why this may have happened include:</p>\n\
                <ul>\n\
                <li>No record of your {tax_year} Notice of Assessment on file with the Canada \
                Revenue Agency (CRA).</li>\n\
                <li>The identity records that you have supplied do not match CRA records.</li>\n\
                <li>Your income does not qualify/exceeds the maximum eligible amount under the \
                program.</li>\n\
                </ul>\n\
                <p>Questions?</p>\n\
                {CONTACT}"
            ),
            Notification::HouseholdCancel => format!(
                "{GENERATED}\
                <p>Your application has been cancelled.</p>\n\
                <p>Some examples of why this may have happened include:</p>\n\
                <ul>\n\
                <li>The person you identified as your spouse cancelled the application.</li>\n\
                <li>The person you identified as your spouse didn’t complete the application \
                within 28 days.</li>\n\
                </ul>\n\
                <p>You are encouraged to apply again as an individual if your spouse is unable to \
                complete the household application.</p>\n\
                <p>Questions?</p>\n\
                {CONTACT}"
            ),
            Notification::Cancel => format!(
                "{GENERATED}\
                <p>Your application has been cancelled.</p>\n\
                <p>If you haven’t yet received a rebate you are encouraged to apply again.</p>\n\
                <p>If you think this was done in error or you have questions, please feel free to \
                contact us at {PROGRAM_EMAIL}</p>\n"
            ),
            Notification::Expired => format!(
                "{GENERATED}\
                <p>You are receiving this email as it has been one year since you were approved \
                for a Passenger Vehicle Rebate. Your rebate approval has expired.</p>\n\
                <p>You can reapply for another rebate approval 15 days from today. If you want to \
                reapply within the next 15 days, please contact {PROGRAM_EMAIL}</p>\n\
                <p>{PROGRAM_SITE}</p>\n\
                {FUNDS_NOTE}\
                <p>Questions?</p>\n\
                {CONTACT}"
            ),
            Notification::ExpiryWarning => format!(
                "{GENERATED}\
                <p>You are receiving this email as it has nearly been one year since you were \
                approved for a Passenger Vehicle Rebate. Your rebate approval will expire in 2 \
                weeks.</p>\n\
                <p>If you do not purchase an EV and receive a rebate within the next 2 weeks, you \
                will need to apply for a new rebate approval on the program website:</p>\n\
                <p>{PROGRAM_SITE}</p>\n\
                {FUNDS_NOTE}\
                <p>Questions?</p>\n\
                {CONTACT}"
            ),
        }
    }
}

const GENERATED: &str = "<p>This email was generated by the CleanBC Go Electric Passenger \
Vehicle Rebate program application.</p>\n";

const CONTACT: &str = "<p>Please feel free to contact us at ZEVPrograms@gov.bc.ca</p>\n";

const FUNDS_NOTE: &str =
    "<p>Please note that rebates are available until the program funds are exhausted.</p>\n";

fn wrap(inner: &str) -> String {
    format!("<html>\n<body>\n{}</body>\n</html>\n", inner)
}

fn reason_items(reasons: &str) -> String {
    reasons
        .split(';')
        .map(|reason| format!("<li>{}</li>\n", reason.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RebateTier;

    #[test]
    fn test_subject_suffixes() {
        assert_eq!(
            Notification::Expired.render("abc", "").subject,
            "CleanBC Go Electric - Application #abc – Expired"
        );
        assert_eq!(
            Notification::ExpiryWarning.render("abc", "").subject,
            "CleanBC Go Electric - Application #abc – Will expire in 2 weeks"
        );
        assert_eq!(
            Notification::IndividualConfirm.render("abc", "").subject,
            "CleanBC Go Electric - Application #abc"
        );
    }

    #[test]
    fn test_approved_uses_tier_amounts() {
        let email = Notification::Approved {
            applicant_full_name: "Jane Doe".to_string(),
            amounts: RebateTier::TwoThousand.amounts(),
        }
        .render("app-9", "");

        assert!(email.body.contains("Dear Jane Doe,"));
        assert!(email.body.contains("up to $2000."));
        assert!(email.body.contains("$500 rebate for long-range ZEV 12-month"));
        assert!(email.body.contains("$250 rebate for short-range PHEV 12-month"));
        assert!(email.subject.ends_with(" – Approved"));
    }

    #[test]
    fn test_reject_lists_each_reason() {
        let email = Notification::Reject {
            reasons: "Name mismatch; Expired licence".to_string(),
        }
        .render("x", "");

        assert!(email.body.contains("<li>Name mismatch</li>"));
        assert!(email.body.contains("<li>Expired licence</li>"));
    }

    #[test]
    fn test_spouse_initial_link_and_cc() {
        let email = Notification::SpouseInitial {
            initiator_email: "first@example.com".to_string(),
        }
        .render("hh-1", "https://goelectric.example.com");

        assert!(email
            .body
            .contains("https://goelectric.example.com/household?q=hh-1"));
        assert_eq!(email.cc, vec!["first@example.com".to_string()]);
    }

    #[test]
    fn test_not_approved_tax_year() {
        let email = Notification::NotApproved { tax_year: 2021 }.render("x", "");
        assert!(email.body.contains("No record of your 2021 Notice of Assessment"));
    }

    #[test]
    fn test_notification_tagging() {
        let json = serde_json::to_string(&Notification::Expired).unwrap();
        assert_eq!(json, r#"{"template":"expired"}"#);

        let parsed: Notification =
            serde_json::from_str(r#"{"template":"not_approved","tax_year":2022}"#).unwrap();
        assert_eq!(parsed, Notification::NotApproved { tax_year: 2022 });
    }
}
