use crate::error::RepoError;
use crate::fields;
use crate::models::{Category, CategoryPatch, NewCategory, DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_ICON};
use crate::store::{EntityKind, FieldSpec, RecordStore, SortOrder};
use crate::validate::{validate_category, validate_category_patch};
use serde_json::json;
use std::sync::Arc;

const KIND: EntityKind = EntityKind::Category;

/// Cached category list. Deleting a category leaves tasks that name it alone.
pub struct CategoryRepository {
    store: Arc<dyn RecordStore>,
    categories: Vec<Category>,
    loading: bool,
    error: Option<String>,
}

impl CategoryRepository {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        CategoryRepository {
            store,
            categories: Vec::new(),
            loading: false,
            error: None,
        }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn by_name(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Color and icon for a task's category, falling back to the defaults
    /// when the category no longer exists.
    pub fn appearance(&self, name: &str) -> (&str, &str) {
        match self.by_name(name) {
            Some(category) => (category.color.as_str(), category.icon.as_str()),
            None => (DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_ICON),
        }
    }

    /// All categories, oldest first.
    pub async fn get_all(&self) -> Result<Vec<Category>, RepoError> {
        let spec = FieldSpec::new(fields::wire_fields(KIND), SortOrder::Asc);
        let rows = self.store.fetch_all(KIND, &spec).await.map_err(|err| {
            tracing::error!(error = %err, "error fetching categories");
            RepoError::from_load(err)
        })?;
        rows.into_iter()
            .map(|row| fields::decode_category(row).map_err(RepoError::on_read))
            .collect()
    }

    pub async fn get_by_id(&self, id: u64) -> Result<Category, RepoError> {
        let row = self
            .store
            .fetch_one(KIND, id)
            .await
            .map_err(RepoError::from_load)?;
        fields::decode_category(row).map_err(RepoError::on_read)
    }

    pub async fn load(&mut self) -> Result<(), RepoError> {
        self.loading = true;
        self.error = None;
        let result = self.get_all().await;
        self.loading = false;

        match result {
            Ok(categories) => {
                self.categories = categories;
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to load categories");
                self.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    pub async fn create(&mut self, new_category: NewCategory) -> Result<Category, RepoError> {
        validate_category(&new_category)?;
        let wire = fields::encode(KIND, &new_category)?;
        let created = self
            .store
            .create(KIND, vec![wire])
            .await
            .and_then(|batch| batch.into_first_record())
            .map_err(|err| {
                tracing::error!(error = %err, "failed to create category");
                RepoError::from_write(err)
            })?
            .ok_or_else(|| RepoError::Write("store returned no category".into()))?;
        let category = fields::decode_category(created)?;

        tracing::info!(id = category.id, name = %category.name, "category created");
        self.categories.push(category.clone());
        Ok(category)
    }

    pub async fn update(&mut self, id: u64, patch: CategoryPatch) -> Result<Category, RepoError> {
        validate_category_patch(&patch)?;
        let mut wire = fields::encode(KIND, &patch)?;
        wire.insert(fields::ID_FIELD.to_string(), json!(id));

        let written = self
            .store
            .update(KIND, vec![wire])
            .await
            .and_then(|batch| batch.into_first_record())
            .map_err(|err| {
                tracing::error!(id, error = %err, "failed to update category");
                RepoError::from_write(err)
            })?;
        let updated = match written {
            Some(row) => fields::decode_category(row)?,
            None => self.get_by_id(id).await?,
        };

        tracing::info!(id, "category updated");
        if let Some(slot) = self.categories.iter_mut().find(|c| c.id == id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    pub async fn delete(&mut self, id: u64) -> Result<(), RepoError> {
        self.store
            .delete(KIND, &[id])
            .await
            .and_then(|batch| batch.into_result())
            .map_err(|err| {
                tracing::error!(id, error = %err, "failed to delete category");
                RepoError::from_write(err)
            })?;

        tracing::info!(id, "category deleted");
        self.categories.retain(|c| c.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::Value;

    fn repo() -> CategoryRepository {
        CategoryRepository::new(Arc::new(MemoryStore::new()))
    }

    #[tokio::test]
    async fn test_create_appends_and_update_replaces() {
        let mut repo = repo();
        let work = repo.create(NewCategory::new("Work")).await.unwrap();
        let home = repo
            .create(NewCategory::new("Home").color("#FF6B6B").icon("Home"))
            .await
            .unwrap();
        assert_eq!(repo.categories().len(), 2);
        assert_eq!(repo.categories()[1].id, home.id);
        assert_eq!(work.color, DEFAULT_CATEGORY_COLOR);

        let patch = CategoryPatch {
            color: Some("#34D399".into()),
            ..Default::default()
        };
        let updated = repo.update(work.id, patch).await.unwrap();
        assert_eq!(updated.name, "Work");
        assert_eq!(updated.color, "#34D399");
        assert_eq!(repo.by_name("Work").unwrap().color, "#34D399");
    }

    #[tokio::test]
    async fn test_load_orders_oldest_first() {
        let mut repo = repo();
        repo.create(NewCategory::new("First")).await.unwrap();
        repo.create(NewCategory::new("Second")).await.unwrap();

        let mut fresh = CategoryRepository::new(repo.store.clone());
        fresh.load().await.unwrap();
        let names: Vec<&str> = fresh.categories().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["First", "Second"]);
        assert!(!fresh.loading());
        assert!(fresh.error().is_none());
    }

    #[tokio::test]
    async fn test_deleted_category_falls_back_to_default_appearance() {
        let mut repo = repo();
        let errands = repo
            .create(NewCategory::new("Errands").color("#FFD93D").icon("Car"))
            .await
            .unwrap();
        assert_eq!(repo.appearance("Errands"), ("#FFD93D", "Car"));

        repo.delete(errands.id).await.unwrap();
        assert_eq!(
            repo.appearance("Errands"),
            (DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_ICON)
        );
    }

    #[tokio::test]
    async fn test_missing_ids_are_not_found() {
        let mut repo = repo();
        assert!(repo.delete(42).await.unwrap_err().is_not_found());
        assert!(repo
            .update(42, CategoryPatch::default())
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_category_never_reaches_the_store() {
        let mut repo = repo();
        let err = repo
            .create(NewCategory::new("Home").color("#aé€"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepoError::Validation { field: "color", .. }));
        assert!(repo.categories().is_empty());
        assert!(repo.get_all().await.unwrap().is_empty());

        let home = repo.create(NewCategory::new("Home")).await.unwrap();
        let rename = CategoryPatch {
            name: Some("H".into()),
            ..Default::default()
        };
        let err = repo.update(home.id, rename).await.unwrap_err();
        assert!(matches!(err, RepoError::Validation { field: "name", .. }));
        assert_eq!(repo.by_name("Home").unwrap().id, home.id);
    }

    #[test]
    fn test_patch_value_is_an_object() {
        let value = serde_json::to_value(CategoryPatch::default()).unwrap();
        assert_eq!(value, Value::Object(Default::default()));
    }
}
