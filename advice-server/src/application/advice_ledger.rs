use std::sync::Arc;
use std::time::Duration;

use tracing::instrument;
use uuid::Uuid;

use crate::data::advice_repository::AdviceRepository;
use crate::data::bounded;
use crate::domain::advice::{Advice, Category};
use crate::domain::error::DomainError;

pub struct NewAdvice {
    pub category: Category,
    pub question: String,
    pub answer: String,
    pub author_id: Option<Uuid>,
}

#[derive(Clone)]
pub struct AdviceLedger {
    repo: Arc<dyn AdviceRepository>,
    timeout: Duration,
}

impl AdviceLedger {
    pub fn new(repo: Arc<dyn AdviceRepository>, timeout: Duration) -> Self {
        Self { repo, timeout }
    }

    /// Input is taken as already validated.
    #[instrument(skip(self, input), fields(category = %input.category))]
    pub async fn create(&self, input: NewAdvice) -> Result<Advice, DomainError> {
        let advice = Advice::new(input.category, input.question, input.answer, input.author_id);
        bounded(self.timeout, "advices.create", self.repo.create(advice)).await
    }

    pub async fn list(&self, category: Option<Category>) -> Result<Vec<Advice>, DomainError> {
        bounded(self.timeout, "advices.list", self.repo.list(category)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::advice_repository::MockAdviceRepository;
    use crate::data::snapshot_store::{MemoryBackend, SnapshotStore};

    fn entry(category: Category) -> NewAdvice {
        NewAdvice {
            category,
            question: "How?".into(),
            answer: "Like this.".into(),
            author_id: None,
        }
    }

    #[tokio::test]
    async fn list_is_newest_first_and_filterable() {
        let ledger = AdviceLedger::new(
            Arc::new(SnapshotStore::new(MemoryBackend::new())),
            Duration::from_secs(5),
        );
        let first = ledger.create(entry(Category::Study)).await.unwrap();
        ledger.create(entry(Category::Life)).await.unwrap();
        let last = ledger.create(entry(Category::Study)).await.unwrap();

        let all = ledger.list(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        let study = ledger.list(Some(Category::Study)).await.unwrap();
        assert_eq!(study.iter().map(|a| a.id).collect::<Vec<_>>(), vec![last.id, first.id]);
    }

    #[tokio::test]
    async fn create_keeps_author_reference() {
        let ledger = AdviceLedger::new(
            Arc::new(SnapshotStore::new(MemoryBackend::new())),
            Duration::from_secs(5),
        );
        let author = Uuid::new_v4();
        let created = ledger
            .create(NewAdvice {
                author_id: Some(author),
                ..entry(Category::Psychology)
            })
            .await
            .unwrap();
        assert_eq!(created.author_id, Some(author));
        assert_eq!(created.question, "How?");
    }

    #[tokio::test]
    async fn schema_errors_surface_instead_of_empty_list() {
        let mut repo = MockAdviceRepository::new();
        repo.expect_list()
            .returning(|_| Err(DomainError::SchemaMissing("relation \"advices\" does not exist".into())));

        let ledger = AdviceLedger::new(Arc::new(repo), Duration::from_secs(5));
        assert!(matches!(
            ledger.list(Some(Category::Life)).await,
            Err(DomainError::SchemaMissing(_))
        ));
    }
}
