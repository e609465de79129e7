//! Email Feature Extraction

use super::layout::{email_index as idx, FEATURE_COUNT};
use super::vector::{FeatureSource, FeatureVector};
use super::{flag, hour_of_day, weekday};
use crate::logic::observation::{Domain, EmailMessage};

impl FeatureSource for EmailMessage {
    const DOMAIN: Domain = Domain::Email;

    fn features(&self) -> FeatureVector {
        let mut values = [0.0f64; FEATURE_COUNT];

        values[idx::NUM_RECIPIENTS] = self.num_recipients as f64;
        values[idx::EMAIL_SIZE] = self.email_size;
        values[idx::HAS_ATTACHMENT] = flag(self.has_attachment);
        values[idx::NUM_ATTACHMENTS] = self.num_attachments as f64;
        values[idx::SUBJECT_LENGTH] = self.subject_length as f64;
        values[idx::BODY_LENGTH] = self.body_length as f64;
        values[idx::IS_REPLY] = flag(self.is_reply);
        values[idx::IS_FORWARD] = flag(self.is_forward);
        values[idx::HOUR] = hour_of_day(&self.timestamp);
        values[idx::WEEKDAY] = weekday(&self.timestamp);
        values[idx::SENDER_DOMAIN_LENGTH] = self.sender_domain().chars().count() as f64;

        FeatureVector::from_values(Domain::Email, values)
    }
}
