//! Equipment repository: listing, registration and transactional stock movements

use chrono::NaiveDate;
use sqlx::{PgConnection, Pool, Postgres, Row};
use uuid::Uuid;

use super::logs::LogsRepository;
use crate::{
    error::{AppError, AppResult},
    models::{
        equipment::{
            tidy, tidy_opt, CreateEquipment, Equipment, EquipmentQuery, MatchKey, SiteSummary,
            StatusSummary, UpdateEquipment,
        },
        import_report::{ImportReport, ImportedEquipment},
        log::{LogKind, NewLogEntry},
        movement::{plan_move, Checkout, MovePlan, MovementOutcome, SiteReturnOutcome},
        status::EquipmentStatus,
        today,
    },
};

/// What a single movement asks for
#[derive(Debug, Clone)]
pub struct MoveRequest {
    pub id: Uuid,
    pub expected_version: i32,
    /// `None` moves the whole row
    pub quantity: Option<i32>,
    pub target: EquipmentStatus,
    /// Required when the target is rented or dispatched
    pub checkout: Option<Checkout>,
    pub log_kind: LogKind,
}

#[derive(Clone)]
pub struct EquipmentRepository {
    pool: Pool<Postgres>,
}

impl EquipmentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// List equipment with optional search, status and overdue filters
    pub async fn list(&self, query: &EquipmentQuery, today: NaiveDate) -> AppResult<Vec<Equipment>> {
        let mut conditions = Vec::new();
        let mut idx = 1;

        let search = query
            .search
            .as_deref()
            .map(tidy)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")));

        if search.is_some() {
            conditions.push(format!(
                r#"(category ILIKE ${i} OR name ILIKE ${i} OR brand ILIKE ${i}
                   OR notes ILIKE ${i} OR lender ILIKE ${i} OR status ILIKE ${i}
                   OR COALESCE(borrower, '') ILIKE ${i}
                   OR COALESCE(dispatch_note, '') ILIKE ${i})"#,
                i = idx
            ));
            idx += 1;
        }
        if query.status.is_some() {
            conditions.push(format!("status = ${}", idx));
            idx += 1;
        }
        match query.overdue {
            Some(true) => conditions.push(format!(
                "status IN ('rented', 'dispatched') AND due_date < ${}",
                idx
            )),
            Some(false) => conditions.push(format!(
                "NOT (status IN ('rented', 'dispatched') AND due_date IS NOT NULL AND due_date < ${})",
                idx
            )),
            None => {}
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        let sql = format!(
            "SELECT * FROM equipment {} ORDER BY category, name, brand, status",
            where_clause
        );

        let mut builder = sqlx::query_as::<_, Equipment>(&sql);
        if let Some(ref pattern) = search {
            builder = builder.bind(pattern);
        }
        if let Some(status) = query.status {
            builder = builder.bind(status);
        }
        if query.overdue.is_some() {
            builder = builder.bind(today);
        }

        let rows = builder.fetch_all(&self.pool).await?;
        Ok(rows)
    }

    /// Get equipment by ID
    pub async fn get_by_id(&self, id: Uuid) -> AppResult<Equipment> {
        sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
    }

    /// Units per status plus units past their due date
    pub async fn summary(&self, today: NaiveDate) -> AppResult<StatusSummary> {
        let rows = sqlx::query(
            "SELECT status, COALESCE(SUM(quantity), 0)::bigint AS units FROM equipment GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut summary = StatusSummary::default();
        for row in rows {
            let status: EquipmentStatus = row.try_get("status")?;
            summary.add(status, row.try_get("units")?);
        }

        summary.overdue = sqlx::query_scalar(
            r#"
            SELECT COALESCE(SUM(quantity), 0)::bigint FROM equipment
            WHERE status IN ('rented', 'dispatched') AND due_date < $1
            "#,
        )
        .bind(today)
        .fetch_one(&self.pool)
        .await?;

        Ok(summary)
    }

    /// Sites that currently hold dispatched gear
    pub async fn sites(&self) -> AppResult<Vec<SiteSummary>> {
        let rows = sqlx::query_as::<_, SiteSummary>(
            r#"
            SELECT borrower AS site, COUNT(*) AS entries,
                   COALESCE(SUM(quantity), 0)::bigint AS units,
                   MIN(due_date) AS earliest_due
            FROM equipment
            WHERE status = 'dispatched' AND borrower IS NOT NULL
            GROUP BY borrower
            ORDER BY borrower
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Dispatched rows for the given sites, grouped by site
    pub async fn dispatched_to(&self, sites: &[String]) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT * FROM equipment
            WHERE status = 'dispatched' AND borrower = ANY($1)
            ORDER BY borrower, category, name
            "#,
        )
        .bind(sites)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Every row, for the CSV backup
    pub async fn all(&self) -> AppResult<Vec<Equipment>> {
        let rows = sqlx::query_as::<_, Equipment>(
            "SELECT * FROM equipment ORDER BY category, name, brand, status",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Register new in-stock equipment
    pub async fn create(&self, data: &CreateEquipment, actor: &str) -> AppResult<Equipment> {
        let name = tidy(&data.name);
        let brand = tidy(&data.brand);
        let key = MatchKey::new(&name, &brand);

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, Equipment>(
            r#"
            INSERT INTO equipment (id, category, name, quantity, brand, notes, lender, status,
                                   photo_path, match_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, 'in_stock', $8, $9)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tidy(&data.category))
        .bind(&name)
        .bind(data.quantity)
        .bind(&brand)
        .bind(data.notes.trim())
        .bind(tidy(&data.lender))
        .bind(tidy_opt(data.photo_path.as_deref()))
        .bind(key.as_str())
        .fetch_one(&mut *tx)
        .await?;

        LogsRepository::append(
            &mut tx,
            &NewLogEntry::new(actor, LogKind::Register, &row.name, row.quantity, "stock")
                .dated(Some(today()), None),
        )
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Edit descriptive fields of a row
    pub async fn update(&self, id: Uuid, data: &UpdateEquipment, actor: &str) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;

        let current = lock(&mut tx, id).await?;
        check_version(&current, data.version)?;

        let name = data.name.as_deref().map(tidy).unwrap_or(current.name);
        let brand = data.brand.as_deref().map(tidy).unwrap_or(current.brand);
        let key = MatchKey::new(&name, &brand);
        let photo_path = match data.photo_path {
            Some(ref p) => tidy_opt(Some(p)),
            None => current.photo_path,
        };

        let row = sqlx::query_as::<_, Equipment>(
            r#"
            UPDATE equipment
            SET category = $2, name = $3, quantity = $4, brand = $5, notes = $6, lender = $7,
                photo_path = $8, match_key = $9, version = version + 1, updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(data.category.as_deref().map(tidy).unwrap_or(current.category))
        .bind(&name)
        .bind(data.quantity.unwrap_or(current.quantity))
        .bind(&brand)
        .bind(data.notes.as_deref().map(str::trim).map(str::to_string).unwrap_or(current.notes))
        .bind(data.lender.as_deref().map(tidy).unwrap_or(current.lender))
        .bind(photo_path)
        .bind(key.as_str())
        .fetch_one(&mut *tx)
        .await?;

        LogsRepository::append(
            &mut tx,
            &NewLogEntry::new(actor, LogKind::Edit, &row.name, row.quantity, row.status.as_str()),
        )
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Delete a row that is not out with a renter or site
    pub async fn delete(&self, id: Uuid, expected_version: Option<i32>, actor: &str) -> AppResult<Equipment> {
        let mut tx = self.pool.begin().await?;

        let row = lock(&mut tx, id).await?;
        if let Some(version) = expected_version {
            check_version(&row, version)?;
        }
        delete_locked(&mut tx, &row, actor).await?;

        tx.commit().await?;
        Ok(row)
    }

    /// Move units of one row to another status, splitting or merging rows as
    /// needed. Runs in one transaction with the log entry.
    pub async fn move_units(&self, request: &MoveRequest, actor: &str) -> AppResult<MovementOutcome> {
        let mut tx = self.pool.begin().await?;

        let source = lock(&mut tx, request.id).await?;
        check_version(&source, request.expected_version)?;

        match request.log_kind {
            LogKind::Return if !source.status.is_out() => {
                return Err(AppError::BusinessRule(format!(
                    "{} is {}, not rented or dispatched",
                    source.name, source.status
                )));
            }
            LogKind::StatusChange if !source.status.is_maintenance() => {
                return Err(AppError::BusinessRule(format!(
                    "{} is {}; return it before changing its status",
                    source.name, source.status
                )));
            }
            _ => {}
        }

        let quantity = request.quantity.unwrap_or(source.quantity);
        let stock_match = if request.target == EquipmentStatus::InStock {
            lock_stock_match(&mut tx, &source.match_key(), source.id).await?
        } else {
            None
        };

        let plan = plan_move(&source, quantity, request.target, stock_match.as_ref())?;
        let outcome = apply_plan(
            &mut tx,
            &source,
            quantity,
            plan,
            request.target,
            request.checkout.as_ref(),
        )
        .await?;

        let (target, action_date, due_date) = match request.checkout {
            Some(ref c) => (c.borrower.clone(), Some(c.checkout_date), Some(c.due_date)),
            None if source.status.is_out() => (
                source.borrower.clone().unwrap_or_default(),
                Some(today()),
                None,
            ),
            None => (
                request.target.as_str().to_string(),
                Some(today()),
                None,
            ),
        };
        LogsRepository::append(
            &mut tx,
            &NewLogEntry::new(actor, request.log_kind, &source.name, quantity, &target)
                .dated(action_date, due_date),
        )
        .await?;

        tx.commit().await?;
        Ok(outcome)
    }

    /// Return everything currently rented or dispatched to `site`
    pub async fn return_site(&self, site: &str, actor: &str) -> AppResult<SiteReturnOutcome> {
        let site = tidy(site);
        let mut tx = self.pool.begin().await?;

        let rows = sqlx::query_as::<_, Equipment>(
            r#"
            SELECT * FROM equipment
            WHERE borrower = $1 AND status IN ('rented', 'dispatched')
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(&site)
        .fetch_all(&mut *tx)
        .await?;

        if rows.is_empty() {
            return Err(AppError::NotFound(format!("Nothing is out with {}", site)));
        }

        let today = today();
        let mut returned_units = 0i64;
        let mut stock: Vec<Equipment> = Vec::new();

        for row in &rows {
            let stock_match = lock_stock_match(&mut tx, &row.match_key(), row.id).await?;
            let plan = plan_move(row, row.quantity, EquipmentStatus::InStock, stock_match.as_ref())?;
            let outcome =
                apply_plan(&mut tx, row, row.quantity, plan, EquipmentStatus::InStock, None).await?;

            LogsRepository::append(
                &mut tx,
                &NewLogEntry::new(actor, LogKind::SiteReturn, &row.name, row.quantity, &site)
                    .dated(Some(today), row.due_date),
            )
            .await?;

            returned_units += i64::from(row.quantity);
            stock.retain(|s| s.id != outcome.moved.id);
            stock.push(outcome.moved);
        }

        tx.commit().await?;

        Ok(SiteReturnOutcome {
            site,
            returned_entries: rows.len(),
            returned_units,
            stock,
        })
    }

    /// Insert parsed backup rows. In-stock rows that collide with an existing
    /// in-stock entry add their quantity to it.
    pub async fn import(&self, rows: &[ImportedEquipment], actor: &str, report: &mut ImportReport) -> AppResult<()> {
        let units = rows
            .iter()
            .try_fold(0i64, |acc, item| acc.checked_add(i64::from(item.quantity)))
            .and_then(|total| i32::try_from(total).ok())
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "The backup holds more than {} units in total",
                    i32::MAX
                ))
            })?;

        let mut tx = self.pool.begin().await?;

        for item in rows {
            let key = MatchKey::new(&item.name, &item.brand);
            let inserted: bool = if item.status == EquipmentStatus::InStock {
                let upserted: Option<bool> = sqlx::query_scalar(
                    r#"
                    INSERT INTO equipment (id, category, name, quantity, brand, notes, lender, status,
                                           photo_path, match_key)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, 'in_stock', $8, $9)
                    ON CONFLICT (match_key) WHERE status = 'in_stock'
                    DO UPDATE SET quantity = equipment.quantity + EXCLUDED.quantity,
                                  version = equipment.version + 1,
                                  updated_at = NOW()
                    WHERE equipment.quantity <= 2147483647 - EXCLUDED.quantity
                    RETURNING (xmax = 0)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(&item.category)
                .bind(&item.name)
                .bind(item.quantity)
                .bind(&item.brand)
                .bind(&item.notes)
                .bind(&item.lender)
                .bind(&item.photo_path)
                .bind(key.as_str())
                .fetch_optional(&mut *tx)
                .await?;

                upserted.ok_or_else(|| {
                    AppError::BusinessRule(format!(
                        "Merging {} units of {} would exceed the largest quantity a row can hold",
                        item.quantity, item.name
                    ))
                })?
            } else {
                sqlx::query(
                    r#"
                    INSERT INTO equipment (id, category, name, quantity, brand, notes, lender, status,
                                           borrower, checkout_date, due_date, dispatch_note,
                                           photo_path, match_key)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(&item.category)
                .bind(&item.name)
                .bind(item.quantity)
                .bind(&item.brand)
                .bind(&item.notes)
                .bind(&item.lender)
                .bind(item.status)
                .bind(&item.borrower)
                .bind(item.checkout_date)
                .bind(item.due_date)
                .bind(&item.dispatch_note)
                .bind(&item.photo_path)
                .bind(key.as_str())
                .execute(&mut *tx)
                .await?;
                true
            };

            if inserted {
                report.imported += 1;
            } else {
                report.merged += 1;
            }
        }

        LogsRepository::append(
            &mut tx,
            &NewLogEntry::new(actor, LogKind::Import, "csv backup", units, &format!("{} rows", rows.len()))
                .dated(Some(today()), None),
        )
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Lock a row for the rest of the transaction
pub(super) async fn lock(conn: &mut PgConnection, id: Uuid) -> AppResult<Equipment> {
    sqlx::query_as::<_, Equipment>("SELECT * FROM equipment WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Equipment {} not found", id)))
}

/// Delete a locked row and record it. Rows out with a renter or site are
/// refused.
pub(super) async fn delete_locked(conn: &mut PgConnection, row: &Equipment, actor: &str) -> AppResult<()> {
    if row.status.is_out() {
        return Err(AppError::BusinessRule(format!(
            "{} is {} and must be returned before deletion",
            row.name, row.status
        )));
    }

    sqlx::query("DELETE FROM equipment WHERE id = $1")
        .bind(row.id)
        .execute(&mut *conn)
        .await?;

    LogsRepository::append(
        conn,
        &NewLogEntry::new(actor, LogKind::Delete, &row.name, row.quantity, row.status.as_str())
            .dated(Some(today()), None),
    )
    .await
}

fn check_version(row: &Equipment, expected: i32) -> AppResult<()> {
    if row.version != expected {
        return Err(AppError::StaleVersion(format!(
            "{} was modified by another user (expected version {}, found {}); reload and retry",
            row.name, expected, row.version
        )));
    }
    Ok(())
}

async fn lock_stock_match(conn: &mut PgConnection, key: &MatchKey, exclude: Uuid) -> AppResult<Option<Equipment>> {
    let row = sqlx::query_as::<_, Equipment>(
        "SELECT * FROM equipment WHERE match_key = $1 AND status = 'in_stock' AND id <> $2 FOR UPDATE",
    )
    .bind(key.as_str())
    .bind(exclude)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row)
}

/// Write a movement plan. The source row and any merge target must already be
/// locked.
async fn apply_plan(
    conn: &mut PgConnection,
    source: &Equipment,
    quantity: i32,
    plan: MovePlan,
    target: EquipmentStatus,
    checkout: Option<&Checkout>,
) -> AppResult<MovementOutcome> {
    let borrower = checkout.map(|c| c.borrower.clone());
    let checkout_date = checkout.map(|c| c.checkout_date);
    let due_date = checkout.map(|c| c.due_date);
    let note = checkout.and_then(|c| c.note.clone());

    match plan {
        MovePlan::Flip => {
            let moved = sqlx::query_as::<_, Equipment>(
                r#"
                UPDATE equipment
                SET status = $2, borrower = $3, checkout_date = $4, due_date = $5,
                    dispatch_note = $6, version = version + 1, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(source.id)
            .bind(target)
            .bind(&borrower)
            .bind(checkout_date)
            .bind(due_date)
            .bind(&note)
            .fetch_one(&mut *conn)
            .await?;

            Ok(MovementOutcome { source: None, moved })
        }
        MovePlan::Split { remaining } => {
            let rest = set_quantity(conn, source.id, remaining).await?;

            let moved = sqlx::query_as::<_, Equipment>(
                r#"
                INSERT INTO equipment (id, category, name, quantity, brand, notes, lender, status,
                                       borrower, checkout_date, due_date, dispatch_note,
                                       photo_path, match_key)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&source.category)
            .bind(&source.name)
            .bind(quantity)
            .bind(&source.brand)
            .bind(&source.notes)
            .bind(&source.lender)
            .bind(target)
            .bind(&borrower)
            .bind(checkout_date)
            .bind(due_date)
            .bind(&note)
            .bind(&source.photo_path)
            .bind(source.match_key().as_str())
            .fetch_one(&mut *conn)
            .await?;

            Ok(MovementOutcome {
                source: Some(rest),
                moved,
            })
        }
        MovePlan::Merge { into, remaining } => {
            let moved = sqlx::query_as::<_, Equipment>(
                r#"
                UPDATE equipment
                SET quantity = quantity + $2, version = version + 1, updated_at = NOW()
                WHERE id = $1
                RETURNING *
                "#,
            )
            .bind(into)
            .bind(quantity)
            .fetch_one(&mut *conn)
            .await?;

            let rest = if remaining == 0 {
                sqlx::query("DELETE FROM equipment WHERE id = $1")
                    .bind(source.id)
                    .execute(&mut *conn)
                    .await?;
                None
            } else {
                Some(set_quantity(conn, source.id, remaining).await?)
            };

            Ok(MovementOutcome { source: rest, moved })
        }
    }
}

async fn set_quantity(conn: &mut PgConnection, id: Uuid, quantity: i32) -> AppResult<Equipment> {
    let row = sqlx::query_as::<_, Equipment>(
        r#"
        UPDATE equipment
        SET quantity = $2, version = version + 1, updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(quantity)
    .fetch_one(&mut *conn)
    .await?;
    Ok(row)
}
