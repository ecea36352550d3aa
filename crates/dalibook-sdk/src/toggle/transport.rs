//! Confirmation transport for toggles

use super::subject::{SubjectId, SubjectKind};
use crate::error::{Result, SdkError};
use async_trait::async_trait;
use dalibook_client::DalibookClient;

/// Sends the confirmed state of a toggle to the server
///
/// `engage = true` likes/joins, `false` unlikes/leaves.
#[async_trait]
pub trait ToggleTransport: Send + Sync {
    async fn confirm(&self, subject: &SubjectId, engage: bool) -> Result<()>;
}

/// Toggle transport backed by the Dalibook HTTP routes
#[derive(Debug, Clone)]
pub struct HttpToggleTransport {
    client: DalibookClient,
}

impl HttpToggleTransport {
    pub fn new(client: DalibookClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ToggleTransport for HttpToggleTransport {
    async fn confirm(&self, subject: &SubjectId, engage: bool) -> Result<()> {
        match (subject.kind, engage) {
            (SubjectKind::Like, true) => self.client.like_post(&subject.id).await?,
            (SubjectKind::Like, false) => self.client.unlike_post(&subject.id).await?,
            (SubjectKind::Membership, true) => {
                if !self.client.join_project(&subject.id).await?.joined {
                    return Err(SdkError::Rejected(format!("join {} not applied", subject.id)));
                }
            }
            (SubjectKind::Membership, false) => {
                if !self.client.leave_project(&subject.id).await?.left {
                    return Err(SdkError::Rejected(format!("leave {} not applied", subject.id)));
                }
            }
        }
        Ok(())
    }
}
