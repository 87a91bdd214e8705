use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info};

use crate::api::queries;
use crate::api::types::{DocumentRow, QuestionRow};
use crate::document::Document;
use crate::error::{Result, StudyError};
use crate::questions::{Question, QuestionStore};

#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    key: String,
}

impl SupabaseClient {
    pub fn new(project_url: &str, anon_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: format!("{}/rest/v1", project_url.trim_end_matches('/')),
            key: anon_key.to_string(),
        }
    }

    #[cfg(test)]
    pub fn new_with_base_url(base_url: &str, key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
            key: key.to_string(),
        }
    }

    fn authorized(&self, req: RequestBuilder) -> RequestBuilder {
        req.header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
    }

    fn table(&self, table: &str) -> String {
        format!("{}/{}", self.base_url, table)
    }

    async fn check(resp: Response) -> Result<Response> {
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(StudyError::Api { status, message });
        }
        Ok(resp)
    }

    pub async fn fetch_document(&self, id: &str) -> Result<Document> {
        let resp = self
            .authorized(self.client.get(self.table(queries::DOCUMENTS)))
            .query(&queries::document_by_id(id))
            .send()
            .await?;
        let rows = Self::check(resp).await?.json::<Vec<DocumentRow>>().await?;
        let row = rows.into_iter().next().ok_or_else(|| StudyError::Api {
            status: 404,
            message: format!("document {} not found", id),
        })?;
        debug!(id, "Fetched document");
        row.into_document()
    }

    pub async fn fetch_questions(&self, document_id: &str) -> Result<QuestionStore> {
        let resp = self
            .authorized(self.client.get(self.table(queries::QUESTIONS)))
            .query(&queries::questions_for_document(document_id))
            .send()
            .await?;
        let rows = Self::check(resp).await?.json::<Vec<QuestionRow>>().await?;
        debug!(document_id, rows = rows.len(), "Fetched questions");
        Ok(QuestionStore::from_rows(rows))
    }

    /// Delete every stored question of the section, then insert the new
    /// list in order. An empty list only deletes.
    pub async fn replace_section_questions(
        &self,
        document_id: &str,
        section_index: usize,
        section_title: &str,
        questions: &[Question],
    ) -> Result<()> {
        let resp = self
            .authorized(self.client.delete(self.table(queries::QUESTIONS)))
            .query(&queries::section_questions(document_id, section_index))
            .send()
            .await?;
        Self::check(resp).await?;

        if questions.is_empty() {
            return Ok(());
        }
        let rows: Vec<QuestionRow> = questions
            .iter()
            .enumerate()
            .map(|(position, q)| {
                QuestionRow::from_question(document_id, section_index, section_title, position, q)
            })
            .collect();
        let resp = self
            .authorized(self.client.post(self.table(queries::QUESTIONS)))
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await?;
        Self::check(resp).await?;
        info!(
            document_id,
            section_index,
            count = rows.len(),
            "Section questions saved"
        );
        Ok(())
    }
}
