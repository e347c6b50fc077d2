//! In-memory store for tests and single-process embedding.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::catalog::{AxisStatus, CatalogInfo, CatalogProduct, LocaleInfo, WorkflowAxis};
use crate::models::content::LocalizedContent;
use crate::models::financials::LocaleFinancialRecord;
use crate::models::workflow::{WorkflowJob, WorkflowStatus};

use super::{StoreError, WorkflowStore};

/// Hash-map twin of [`super::PgStore`]. Upsert keys match the database
/// uniqueness constraints so idempotence behaves identically.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    catalogs: HashMap<Uuid, CatalogInfo>,
    locales: HashMap<Uuid, LocaleInfo>,
    catalog_products: HashMap<Uuid, CatalogProduct>,
    workflow_jobs: HashMap<Uuid, WorkflowJob>,
    financials: HashMap<(Uuid, Uuid, Uuid), LocaleFinancialRecord>,
    content: HashMap<(Uuid, String), LocalizedContent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_catalog(&self, catalog: CatalogInfo) {
        self.lock().catalogs.insert(catalog.id, catalog);
    }

    pub fn seed_locale(&self, locale: LocaleInfo) {
        self.lock().locales.insert(locale.id, locale);
    }

    pub fn seed_catalog_product(&self, product: CatalogProduct) {
        self.lock().catalog_products.insert(product.id, product);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("memory store mutex poisoned")
    }
}

#[async_trait]
impl WorkflowStore for MemoryStore {
    async fn catalog(&self, id: Uuid) -> Result<Option<CatalogInfo>, StoreError> {
        Ok(self.lock().catalogs.get(&id).cloned())
    }

    async fn locale(&self, id: Uuid) -> Result<Option<LocaleInfo>, StoreError> {
        Ok(self.lock().locales.get(&id).cloned())
    }

    async fn locale_by_code(&self, code: &str) -> Result<Option<LocaleInfo>, StoreError> {
        Ok(self
            .lock()
            .locales
            .values()
            .find(|locale| locale.code == code)
            .cloned())
    }

    async fn catalog_product(&self, id: Uuid) -> Result<Option<CatalogProduct>, StoreError> {
        Ok(self.lock().catalog_products.get(&id).cloned())
    }

    async fn insert_workflow_job(&self, job: &WorkflowJob) -> Result<(), StoreError> {
        self.lock().workflow_jobs.insert(job.id, job.clone());
        Ok(())
    }

    async fn workflow_job(&self, id: Uuid) -> Result<Option<WorkflowJob>, StoreError> {
        Ok(self.lock().workflow_jobs.get(&id).cloned())
    }

    async fn workflow_jobs_for_product(
        &self,
        catalog_product_id: Uuid,
    ) -> Result<Vec<WorkflowJob>, StoreError> {
        let mut jobs: Vec<WorkflowJob> = self
            .lock()
            .workflow_jobs
            .values()
            .filter(|job| job.catalog_product_id == Some(catalog_product_id))
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(jobs)
    }

    async fn record_workflow_item(
        &self,
        id: Uuid,
        failed: bool,
    ) -> Result<Option<WorkflowJob>, StoreError> {
        let mut inner = self.lock();
        let Some(job) = inner.workflow_jobs.get_mut(&id) else {
            return Ok(None);
        };
        if job.all_items_settled() {
            return Ok(None);
        }
        if failed {
            job.failed_items += 1;
        } else {
            job.completed_items += 1;
        }
        job.recompute_progress();
        Ok(Some(job.clone()))
    }

    async fn complete_workflow_job(
        &self,
        id: Uuid,
        status: WorkflowStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(job) = inner.workflow_jobs.get_mut(&id) {
            if job.status == WorkflowStatus::Running {
                job.status = status;
                job.completed_at = Some(Utc::now());
                if error.is_some() {
                    job.error = error.map(str::to_string);
                }
            }
        }
        Ok(())
    }

    async fn force_complete_stale(
        &self,
        older_than: chrono::Duration,
    ) -> Result<Vec<Uuid>, StoreError> {
        let cutoff = Utc::now() - older_than;
        let mut closed = Vec::new();
        let mut inner = self.lock();
        for job in inner.workflow_jobs.values_mut() {
            if job.status == WorkflowStatus::Running && job.created_at < cutoff {
                job.status = if job.failed_items > 0 {
                    WorkflowStatus::Failed
                } else {
                    WorkflowStatus::Completed
                };
                job.completed_at = Some(Utc::now());
                job.error
                    .get_or_insert_with(|| "force-completed after staleness threshold".to_string());
                closed.push(job.id);
            }
        }
        Ok(closed)
    }

    async fn begin_product_workflow(
        &self,
        id: Uuid,
        axis: WorkflowAxis,
        initiated_by: &str,
        selected_locales: &[String],
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(product) = inner.catalog_products.get_mut(&id) {
            match axis {
                WorkflowAxis::Locale => product.locale_workflow_status = Some(AxisStatus::InProgress),
                WorkflowAxis::Content => {
                    product.content_workflow_status = Some(AxisStatus::InProgress)
                }
            }
            product.workflow_initiated_by = Some(initiated_by.to_string());
            product.workflow_initiated_at = Some(Utc::now());
            product.workflow_completed_at = None;
            product.selected_locales = selected_locales.to_vec();
        }
        Ok(())
    }

    async fn complete_product_workflow(
        &self,
        id: Uuid,
        axis: WorkflowAxis,
        status: AxisStatus,
    ) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if let Some(product) = inner.catalog_products.get_mut(&id) {
            match axis {
                WorkflowAxis::Locale => product.locale_workflow_status = Some(status),
                WorkflowAxis::Content => product.content_workflow_status = Some(status),
            }
            product.workflow_completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn upsert_locale_financials(
        &self,
        record: &LocaleFinancialRecord,
    ) -> Result<(), StoreError> {
        let key = (record.product_id, record.catalog_id, record.locale_id);
        let mut inner = self.lock();
        let mut stored = record.clone();
        if let Some(existing) = inner.financials.get(&key) {
            stored.id = existing.id;
        }
        inner.financials.insert(key, stored);
        Ok(())
    }

    async fn locale_financials(
        &self,
        product_id: Uuid,
        catalog_id: Uuid,
        locale_id: Uuid,
    ) -> Result<Option<LocaleFinancialRecord>, StoreError> {
        Ok(self
            .lock()
            .financials
            .get(&(product_id, catalog_id, locale_id))
            .cloned())
    }

    async fn upsert_localized_content(
        &self,
        content: &LocalizedContent,
    ) -> Result<(), StoreError> {
        let key = (content.product_id, content.locale_code.clone());
        let mut inner = self.lock();
        let mut stored = content.clone();
        if let Some(existing) = inner.content.get(&key) {
            stored.id = existing.id;
        }
        inner.content.insert(key, stored);
        Ok(())
    }

    async fn localized_content(
        &self,
        product_id: Uuid,
        locale_code: &str,
    ) -> Result<Option<LocalizedContent>, StoreError> {
        Ok(self
            .lock()
            .content
            .get(&(product_id, locale_code.to_string()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::JobKind;

    #[tokio::test]
    async fn test_record_workflow_item_stops_at_total() {
        let store = MemoryStore::new();
        let workflow = WorkflowJob::new(
            "pricing",
            JobKind::LocaleFinancials,
            2,
            "EU",
            vec![],
            vec![],
            None,
        );
        store.insert_workflow_job(&workflow).await.unwrap();

        assert!(store
            .record_workflow_item(workflow.id, false)
            .await
            .unwrap()
            .is_some());
        assert!(store
            .record_workflow_item(workflow.id, true)
            .await
            .unwrap()
            .is_some());
        // Counters are exhausted; further outcomes are dropped.
        assert!(store
            .record_workflow_item(workflow.id, false)
            .await
            .unwrap()
            .is_none());

        let row = store.workflow_job(workflow.id).await.unwrap().unwrap();
        assert_eq!(row.completed_items + row.failed_items, row.total_items);
    }

    #[tokio::test]
    async fn test_financials_upsert_keeps_identity() {
        let store = MemoryStore::new();
        let mut record = sample_record();
        store.upsert_locale_financials(&record).await.unwrap();
        let first_id = store
            .locale_financials(record.product_id, record.catalog_id, record.locale_id)
            .await
            .unwrap()
            .unwrap()
            .id;

        record.id = Uuid::new_v4();
        store.upsert_locale_financials(&record).await.unwrap();
        let second = store
            .locale_financials(record.product_id, record.catalog_id, record.locale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.id, first_id);
    }

    fn sample_record() -> LocaleFinancialRecord {
        use crate::models::financials::SymbolPosition;
        use rust_decimal::Decimal;

        LocaleFinancialRecord {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            catalog_id: Uuid::new_v4(),
            locale_id: Uuid::new_v4(),
            locale_code: "de-DE".to_string(),
            base_price: Decimal::new(10000, 2),
            conversion_rate: Decimal::new(85, 2),
            rate_date: Utc::now(),
            local_price: Decimal::new(8500, 2),
            tax_rate: Decimal::new(19, 2),
            tax_amount: Decimal::new(1615, 2),
            tax_included_price: Decimal::new(10115, 2),
            regulatory_fee: Decimal::ZERO,
            environmental_fee: Decimal::ZERO,
            rounding_increment: Decimal::new(1, 2),
            symbol_position: SymbolPosition::After,
            decimal_separator: ",".to_string(),
            thousands_separator: ".".to_string(),
            tax_inclusive_display: true,
            promo_price: None,
            promo_starts_at: None,
            promo_ends_at: None,
            effective_from: Utc::now(),
            effective_until: None,
            active: true,
        }
    }
}
