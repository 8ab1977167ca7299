use async_trait::async_trait;
use log::info;
use thiserror::Error;
use url::Url;

use crate::InvitationData;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Invalid base url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Could not deliver invitation: {0}")]
    Delivery(String),
}

/// Delivers the registration link of an invitation to the invitee
#[async_trait]
pub trait InvitationNotifier: Send + Sync {
    async fn notify(&self, invitation: &InvitationData) -> Result<(), NotifyError>;
}

/// Writes the registration link to the log, for an operator to pass on.
pub struct LogNotifier {
    base_url: Url,
}

impl LogNotifier {
    pub fn new(base_url: &str) -> Result<Self, NotifyError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
        })
    }

    /// The link an invitee follows to register
    pub fn registration_link(&self, token: &str) -> Result<Url, NotifyError> {
        let mut link = self.base_url.join("register")?;
        link.query_pairs_mut().append_pair("token", token);

        Ok(link)
    }
}

#[async_trait]
impl InvitationNotifier for LogNotifier {
    async fn notify(&self, invitation: &InvitationData) -> Result<(), NotifyError> {
        let link = self.registration_link(&invitation.id)?;
        info!("Invitation for {} can be redeemed at {}", invitation.email, link);

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::LogNotifier;

    #[test]
    fn registration_link_carries_the_token() {
        let notifier = LogNotifier::new("https://memes.example.com/").unwrap();
        let link = notifier.registration_link("0190-abc").unwrap();

        assert_eq!(
            link.as_str(),
            "https://memes.example.com/register?token=0190-abc"
        );
    }

    #[test]
    fn rejects_malformed_base_urls() {
        assert!(LogNotifier::new("not a url").is_err());
    }
}
