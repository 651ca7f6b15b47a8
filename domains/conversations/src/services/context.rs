//! Background context for reply prompts
//!
//! A conversation may be linked to a job application, a project, or an idea.
//! Each kind of record is described by an optional `ContextSource`; whichever
//! sources are configured contribute a section to the prompt preamble.

use std::sync::Arc;

use async_trait::async_trait;
use tessera_common::Result;
use uuid::Uuid;

use crate::domain::entities::Conversation;

/// Renders a linked record as prompt text
#[async_trait]
pub trait ContextSource: Send + Sync {
    /// Describe `record_id` as seen by `user_id`; `None` when there is nothing to say
    async fn describe(&self, user_id: Uuid, record_id: Uuid) -> Result<Option<String>>;
}

#[derive(Clone, Default)]
pub struct ContextBuilder {
    job_applications: Option<Arc<dyn ContextSource>>,
    projects: Option<Arc<dyn ContextSource>>,
    ideas: Option<Arc<dyn ContextSource>>,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job_applications(mut self, source: Arc<dyn ContextSource>) -> Self {
        self.job_applications = Some(source);
        self
    }

    pub fn with_projects(mut self, source: Arc<dyn ContextSource>) -> Self {
        self.projects = Some(source);
        self
    }

    pub fn with_ideas(mut self, source: Arc<dyn ContextSource>) -> Self {
        self.ideas = Some(source);
        self
    }

    /// Context text for `conversation`, or `None` when no linked record yields any.
    ///
    /// A failing source is logged and skipped.
    pub async fn build(&self, conversation: &Conversation) -> Option<String> {
        let linked = [
            ("Job application", conversation.job_application_id, &self.job_applications),
            ("Project", conversation.project_id, &self.projects),
            ("Idea", conversation.idea_id, &self.ideas),
        ];

        let mut sections = Vec::new();
        for (label, record_id, source) in linked {
            let (Some(record_id), Some(source)) = (record_id, source) else {
                continue;
            };
            match source.describe(conversation.user_id, record_id).await {
                Ok(Some(text)) if !text.trim().is_empty() => {
                    sections.push(format!("{}:\n{}", label, text.trim()));
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        conversation_id = %conversation.id,
                        record_id = %record_id,
                        error = %e,
                        "Skipping unavailable {} context",
                        label.to_lowercase()
                    );
                }
            }
        }

        if sections.is_empty() {
            None
        } else {
            Some(sections.join("\n\n"))
        }
    }
}
