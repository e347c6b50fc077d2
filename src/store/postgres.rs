use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::catalog::{AxisStatus, CatalogInfo, CatalogProduct, LocaleInfo, WorkflowAxis};
use crate::models::content::LocalizedContent;
use crate::models::financials::{LocaleFinancialRecord, SymbolPosition};
use crate::models::workflow::{WorkflowJob, WorkflowStatus};

use super::{StoreError, WorkflowStore};

const WORKFLOW_JOB_COLUMNS: &str = "id, name, job_type, total_items, completed_items, \
     failed_items, progress_percentage, status, catalog_code, product_skus, locale_codes, \
     catalog_product_id, error, created_at, started_at, completed_at";

const LOCALE_FINANCIALS_COLUMNS: &str = "id, product_id, catalog_id, locale_id, locale_code, \
     base_price, conversion_rate, rate_date, local_price, tax_rate, tax_amount, \
     tax_included_price, regulatory_fee, environmental_fee, rounding_increment, \
     symbol_position, decimal_separator, thousands_separator, tax_inclusive_display, \
     promo_price, promo_starts_at, promo_ends_at, effective_from, effective_until, active";

/// PostgreSQL-backed store.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WorkflowStore for PgStore {
    async fn catalog(&self, id: Uuid) -> Result<Option<CatalogInfo>, StoreError> {
        let row = sqlx::query("SELECT id, code, currency FROM catalogs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(match row {
            Some(r) => Some(CatalogInfo {
                id: r.try_get("id")?,
                code: r.try_get("code")?,
                currency: r.try_get("currency")?,
            }),
            None => None,
        })
    }

    async fn locale(&self, id: Uuid) -> Result<Option<LocaleInfo>, StoreError> {
        let row = sqlx::query("SELECT id, code, currency, country FROM locales WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(locale_from_row).transpose()
    }

    async fn locale_by_code(&self, code: &str) -> Result<Option<LocaleInfo>, StoreError> {
        let row = sqlx::query("SELECT id, code, currency, country FROM locales WHERE code = $1")
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.map(locale_from_row).transpose()
    }

    async fn catalog_product(&self, id: Uuid) -> Result<Option<CatalogProduct>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, catalog_id, product_id, sku, locale_workflow_status,
                   content_workflow_status, workflow_initiated_by, workflow_initiated_at,
                   workflow_completed_at, selected_locales
            FROM catalog_products
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(catalog_product_from_row).transpose()
    }

    async fn insert_workflow_job(&self, job: &WorkflowJob) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO workflow_jobs
                (id, name, job_type, total_items, completed_items, failed_items,
                 progress_percentage, status, catalog_code, product_skus, locale_codes,
                 catalog_product_id, error, created_at, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            "#,
        )
        .bind(job.id)
        .bind(&job.name)
        .bind(&job.job_type)
        .bind(job.total_items)
        .bind(job.completed_items)
        .bind(job.failed_items)
        .bind(job.progress_percentage)
        .bind(job.status.to_string())
        .bind(&job.catalog_code)
        .bind(&job.product_skus)
        .bind(&job.locale_codes)
        .bind(job.catalog_product_id)
        .bind(&job.error)
        .bind(job.created_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn workflow_job(&self, id: Uuid) -> Result<Option<WorkflowJob>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {WORKFLOW_JOB_COLUMNS} FROM workflow_jobs WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(workflow_job_from_row).transpose()
    }

    async fn workflow_jobs_for_product(
        &self,
        catalog_product_id: Uuid,
    ) -> Result<Vec<WorkflowJob>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {WORKFLOW_JOB_COLUMNS} FROM workflow_jobs \
             WHERE catalog_product_id = $1 ORDER BY created_at DESC"
        ))
        .bind(catalog_product_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(workflow_job_from_row).collect()
    }

    async fn record_workflow_item(
        &self,
        id: Uuid,
        failed: bool,
    ) -> Result<Option<WorkflowJob>, StoreError> {
        let (completed_delta, failed_delta) = if failed { (0_i32, 1_i32) } else { (1, 0) };

        // Atomic increment; the WHERE clause rejects outcomes beyond
        // total_items so the counter invariant holds under concurrency.
        let row = sqlx::query(&format!(
            r#"
            UPDATE workflow_jobs
            SET completed_items = completed_items + $2,
                failed_items = failed_items + $3,
                progress_percentage = CASE WHEN total_items = 0 THEN 100
                    ELSE LEAST(100, (completed_items + $2) * 100 / total_items) END
            WHERE id = $1 AND completed_items + failed_items < total_items
            RETURNING {WORKFLOW_JOB_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(completed_delta)
        .bind(failed_delta)
        .fetch_optional(&self.pool)
        .await?;

        row.map(workflow_job_from_row).transpose()
    }

    async fn complete_workflow_job(
        &self,
        id: Uuid,
        status: WorkflowStatus,
        error: Option<&str>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE workflow_jobs
            SET status = $2, error = COALESCE($3, error), completed_at = NOW()
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .bind(status.to_string())
        .bind(error)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn force_complete_stale(
        &self,
        older_than: chrono::Duration,
    ) -> Result<Vec<Uuid>, StoreError> {
        let cutoff = Utc::now() - older_than;

        let rows = sqlx::query(
            r#"
            UPDATE workflow_jobs
            SET status = CASE WHEN failed_items > 0 THEN 'failed' ELSE 'completed' END,
                error = COALESCE(error, 'force-completed after staleness threshold'),
                completed_at = NOW()
            WHERE status = 'running' AND created_at < $1
            RETURNING id
            "#,
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|r| r.try_get("id").map_err(StoreError::from))
            .collect()
    }

    async fn begin_product_workflow(
        &self,
        id: Uuid,
        axis: WorkflowAxis,
        initiated_by: &str,
        selected_locales: &[String],
    ) -> Result<(), StoreError> {
        let column = axis_column(axis);

        sqlx::query(&format!(
            r#"
            UPDATE catalog_products
            SET {column} = 'in_progress',
                workflow_initiated_by = $2,
                workflow_initiated_at = NOW(),
                workflow_completed_at = NULL,
                selected_locales = $3
            WHERE id = $1
            "#
        ))
        .bind(id)
        .bind(initiated_by)
        .bind(selected_locales)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn complete_product_workflow(
        &self,
        id: Uuid,
        axis: WorkflowAxis,
        status: AxisStatus,
    ) -> Result<(), StoreError> {
        let column = axis_column(axis);

        sqlx::query(&format!(
            r#"
            UPDATE catalog_products
            SET {column} = $2, workflow_completed_at = NOW()
            WHERE id = $1
            "#
        ))
        .bind(id)
        .bind(status.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_locale_financials(
        &self,
        record: &LocaleFinancialRecord,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO locale_financials
                (id, product_id, catalog_id, locale_id, locale_code, base_price,
                 conversion_rate, rate_date, local_price, tax_rate, tax_amount,
                 tax_included_price, regulatory_fee, environmental_fee, rounding_increment,
                 symbol_position, decimal_separator, thousands_separator,
                 tax_inclusive_display, promo_price, promo_starts_at, promo_ends_at,
                 effective_from, effective_until, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15,
                    $16, $17, $18, $19, $20, $21, $22, $23, $24, $25)
            ON CONFLICT (product_id, catalog_id, locale_id) DO UPDATE
            SET locale_code = EXCLUDED.locale_code,
                base_price = EXCLUDED.base_price,
                conversion_rate = EXCLUDED.conversion_rate,
                rate_date = EXCLUDED.rate_date,
                local_price = EXCLUDED.local_price,
                tax_rate = EXCLUDED.tax_rate,
                tax_amount = EXCLUDED.tax_amount,
                tax_included_price = EXCLUDED.tax_included_price,
                regulatory_fee = EXCLUDED.regulatory_fee,
                environmental_fee = EXCLUDED.environmental_fee,
                rounding_increment = EXCLUDED.rounding_increment,
                symbol_position = EXCLUDED.symbol_position,
                decimal_separator = EXCLUDED.decimal_separator,
                thousands_separator = EXCLUDED.thousands_separator,
                tax_inclusive_display = EXCLUDED.tax_inclusive_display,
                promo_price = EXCLUDED.promo_price,
                promo_starts_at = EXCLUDED.promo_starts_at,
                promo_ends_at = EXCLUDED.promo_ends_at,
                effective_from = EXCLUDED.effective_from,
                effective_until = EXCLUDED.effective_until,
                active = EXCLUDED.active,
                updated_at = NOW()
            "#,
        )
        .bind(record.id)
        .bind(record.product_id)
        .bind(record.catalog_id)
        .bind(record.locale_id)
        .bind(&record.locale_code)
        .bind(record.base_price)
        .bind(record.conversion_rate)
        .bind(record.rate_date)
        .bind(record.local_price)
        .bind(record.tax_rate)
        .bind(record.tax_amount)
        .bind(record.tax_included_price)
        .bind(record.regulatory_fee)
        .bind(record.environmental_fee)
        .bind(record.rounding_increment)
        .bind(record.symbol_position.to_string())
        .bind(&record.decimal_separator)
        .bind(&record.thousands_separator)
        .bind(record.tax_inclusive_display)
        .bind(record.promo_price)
        .bind(record.promo_starts_at)
        .bind(record.promo_ends_at)
        .bind(record.effective_from)
        .bind(record.effective_until)
        .bind(record.active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn locale_financials(
        &self,
        product_id: Uuid,
        catalog_id: Uuid,
        locale_id: Uuid,
    ) -> Result<Option<LocaleFinancialRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {LOCALE_FINANCIALS_COLUMNS} FROM locale_financials \
             WHERE product_id = $1 AND catalog_id = $2 AND locale_id = $3"
        ))
        .bind(product_id)
        .bind(catalog_id)
        .bind(locale_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(locale_financials_from_row).transpose()
    }

    async fn upsert_localized_content(
        &self,
        content: &LocalizedContent,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO localized_content
                (id, product_id, locale_code, name, description, short_description,
                 meta_title, meta_description, keywords, source_locale,
                 machine_translated, generated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (product_id, locale_code) DO UPDATE
            SET name = EXCLUDED.name,
                description = EXCLUDED.description,
                short_description = EXCLUDED.short_description,
                meta_title = EXCLUDED.meta_title,
                meta_description = EXCLUDED.meta_description,
                keywords = EXCLUDED.keywords,
                source_locale = EXCLUDED.source_locale,
                machine_translated = EXCLUDED.machine_translated,
                generated_at = EXCLUDED.generated_at
            "#,
        )
        .bind(content.id)
        .bind(content.product_id)
        .bind(&content.locale_code)
        .bind(&content.name)
        .bind(&content.description)
        .bind(&content.short_description)
        .bind(&content.meta_title)
        .bind(&content.meta_description)
        .bind(&content.keywords)
        .bind(&content.source_locale)
        .bind(content.machine_translated)
        .bind(content.generated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn localized_content(
        &self,
        product_id: Uuid,
        locale_code: &str,
    ) -> Result<Option<LocalizedContent>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, product_id, locale_code, name, description, short_description,
                   meta_title, meta_description, keywords, source_locale,
                   machine_translated, generated_at
            FROM localized_content
            WHERE product_id = $1 AND locale_code = $2
            "#,
        )
        .bind(product_id)
        .bind(locale_code)
        .fetch_optional(&self.pool)
        .await?;

        row.map(localized_content_from_row).transpose()
    }
}

fn axis_column(axis: WorkflowAxis) -> &'static str {
    match axis {
        WorkflowAxis::Locale => "locale_workflow_status",
        WorkflowAxis::Content => "content_workflow_status",
    }
}

fn locale_from_row(row: PgRow) -> Result<LocaleInfo, StoreError> {
    Ok(LocaleInfo {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        currency: row.try_get("currency")?,
        country: row.try_get("country")?,
    })
}

fn catalog_product_from_row(row: PgRow) -> Result<CatalogProduct, StoreError> {
    Ok(CatalogProduct {
        id: row.try_get("id")?,
        catalog_id: row.try_get("catalog_id")?,
        product_id: row.try_get("product_id")?,
        sku: row.try_get("sku")?,
        locale_workflow_status: parse_axis_status(row.try_get("locale_workflow_status")?)?,
        content_workflow_status: parse_axis_status(row.try_get("content_workflow_status")?)?,
        workflow_initiated_by: row.try_get("workflow_initiated_by")?,
        workflow_initiated_at: row.try_get("workflow_initiated_at")?,
        workflow_completed_at: row.try_get("workflow_completed_at")?,
        selected_locales: row.try_get("selected_locales")?,
    })
}

fn parse_axis_status(value: Option<String>) -> Result<Option<AxisStatus>, StoreError> {
    value
        .map(|s| {
            s.parse::<AxisStatus>()
                .map_err(|_| StoreError::Malformed(format!("axis status {s:?}")))
        })
        .transpose()
}

fn workflow_job_from_row(row: PgRow) -> Result<WorkflowJob, StoreError> {
    let status_str: String = row.try_get("status")?;
    let status = status_str
        .parse::<WorkflowStatus>()
        .map_err(|_| StoreError::Malformed(format!("workflow status {status_str:?}")))?;

    Ok(WorkflowJob {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        job_type: row.try_get("job_type")?,
        total_items: row.try_get("total_items")?,
        completed_items: row.try_get("completed_items")?,
        failed_items: row.try_get("failed_items")?,
        progress_percentage: row.try_get("progress_percentage")?,
        status,
        catalog_code: row.try_get("catalog_code")?,
        product_skus: row.try_get("product_skus")?,
        locale_codes: row.try_get("locale_codes")?,
        catalog_product_id: row.try_get("catalog_product_id")?,
        error: row.try_get("error")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
    })
}

fn locale_financials_from_row(row: PgRow) -> Result<LocaleFinancialRecord, StoreError> {
    let position_str: String = row.try_get("symbol_position")?;
    let symbol_position = position_str
        .parse::<SymbolPosition>()
        .map_err(|_| StoreError::Malformed(format!("symbol position {position_str:?}")))?;

    Ok(LocaleFinancialRecord {
        id: row.try_get("id")?,
        product_id: row.try_get("product_id")?,
        catalog_id: row.try_get("catalog_id")?,
        locale_id: row.try_get("locale_id")?,
        locale_code: row.try_get("locale_code")?,
        base_price: row.try_get("base_price")?,
        conversion_rate: row.try_get("conversion_rate")?,
        rate_date: row.try_get("rate_date")?,
        local_price: row.try_get("local_price")?,
        tax_rate: row.try_get("tax_rate")?,
        tax_amount: row.try_get("tax_amount")?,
        tax_included_price: row.try_get("tax_included_price")?,
        regulatory_fee: row.try_get("regulatory_fee")?,
        environmental_fee: row.try_get("environmental_fee")?,
        rounding_increment: row.try_get("rounding_increment")?,
        symbol_position,
        decimal_separator: row.try_get("decimal_separator")?,
        thousands_separator: row.try_get("thousands_separator")?,
        tax_inclusive_display: row.try_get("tax_inclusive_display")?,
        promo_price: row.try_get("promo_price")?,
        promo_starts_at: row.try_get("promo_starts_at")?,
        promo_ends_at: row.try_get("promo_ends_at")?,
        effective_from: row.try_get("effective_from")?,
        effective_until: row.try_get("effective_until")?,
        active: row.try_get("active")?,
    })
}

fn localized_content_from_row(row: PgRow) -> Result<LocalizedContent, StoreError> {
    Ok(LocalizedContent {
        id: row.try_get("id")?,
        product_id: row.try_get("product_id")?,
        locale_code: row.try_get("locale_code")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        short_description: row.try_get("short_description")?,
        meta_title: row.try_get("meta_title")?,
        meta_description: row.try_get("meta_description")?,
        keywords: row.try_get("keywords")?,
        source_locale: row.try_get("source_locale")?,
        machine_translated: row.try_get("machine_translated")?,
        generated_at: row.try_get("generated_at")?,
    })
}
