//! Repository tests against a real database
//!
//! Each test gets a fresh database from `#[sqlx::test]` with the crate's
//! migrations applied. They need `DATABASE_URL` pointing at a Postgres server
//! the test user may create databases on.

use chrono::NaiveDate;
use sqlx::PgPool;

use gearhouse_server::{
    error::AppError,
    export::parse_equipment,
    models::{
        equipment::{CreateEquipment, EquipmentQuery},
        import_report::{ImportReport, ImportedEquipment},
        log::{LogKind, LogQuery},
        movement::Checkout,
        Equipment, EquipmentStatus,
    },
    repository::{equipment::MoveRequest, Repository},
};

const ACTOR: &str = "tester";

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn register(repo: &Repository, name: &str, quantity: i32) -> Equipment {
    repo.equipment
        .create(
            &CreateEquipment {
                category: "Audio".into(),
                name: name.into(),
                quantity,
                brand: "Shure".into(),
                notes: String::new(),
                lender: String::new(),
                photo_path: None,
            },
            ACTOR,
        )
        .await
        .unwrap()
}

fn send_out(row: &Equipment, quantity: i32, target: EquipmentStatus, who: &str, due: NaiveDate) -> MoveRequest {
    MoveRequest {
        id: row.id,
        expected_version: row.version,
        quantity: Some(quantity),
        target,
        checkout: Some(Checkout {
            borrower: who.into(),
            checkout_date: day(2024, 5, 1),
            due_date: due,
            note: None,
        }),
        log_kind: if target == EquipmentStatus::Dispatched {
            LogKind::Dispatch
        } else {
            LogKind::Rent
        },
    }
}

fn take_back(row: &Equipment, quantity: Option<i32>) -> MoveRequest {
    MoveRequest {
        id: row.id,
        expected_version: row.version,
        quantity,
        target: EquipmentStatus::InStock,
        checkout: None,
        log_kind: LogKind::Return,
    }
}

async fn all(repo: &Repository) -> Vec<Equipment> {
    repo.equipment.list(&EquipmentQuery::default(), day(2024, 5, 2)).await.unwrap()
}

fn imported(name: &str, quantity: i32, status: EquipmentStatus, borrower: Option<&str>) -> ImportedEquipment {
    ImportedEquipment {
        row: 1,
        category: "Audio".into(),
        name: name.into(),
        quantity,
        brand: "Shure".into(),
        notes: String::new(),
        lender: String::new(),
        status,
        borrower: borrower.map(str::to_string),
        checkout_date: borrower.map(|_| day(2024, 5, 1)),
        due_date: borrower.map(|_| day(2024, 5, 9)),
        dispatch_note: None,
        photo_path: None,
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn return_merges_back_into_stock(pool: PgPool) {
    let repo = Repository::new(pool);
    let stock = register(&repo, "SM58", 10).await;

    let rented = repo
        .equipment
        .move_units(&send_out(&stock, 4, EquipmentStatus::Rented, "Acme", day(2024, 5, 9)), ACTOR)
        .await
        .unwrap();
    assert_eq!(rented.source.as_ref().unwrap().quantity, 6);
    assert_eq!(rented.moved.quantity, 4);

    let returned = repo
        .equipment
        .move_units(&take_back(&rented.moved, None), ACTOR)
        .await
        .unwrap();
    assert!(returned.source.is_none());
    assert_eq!(returned.moved.id, stock.id);
    assert_eq!(returned.moved.quantity, 10);

    let rows = all(&repo).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, EquipmentStatus::InStock);
}

#[sqlx::test(migrations = "./migrations")]
async fn site_return_merges_every_row_and_keeps_the_total(pool: PgPool) {
    let repo = Repository::new(pool);
    let stock = register(&repo, "SM58", 10).await;

    let first = repo
        .equipment
        .move_units(&send_out(&stock, 3, EquipmentStatus::Dispatched, "Arena", day(2024, 5, 9)), ACTOR)
        .await
        .unwrap();
    let rest = first.source.unwrap();
    repo.equipment
        .move_units(&send_out(&rest, 2, EquipmentStatus::Dispatched, "Arena", day(2024, 5, 10)), ACTOR)
        .await
        .unwrap();
    assert_eq!(all(&repo).await.len(), 3);

    let outcome = repo.equipment.return_site("  Arena ", ACTOR).await.unwrap();
    assert_eq!(outcome.returned_entries, 2);
    assert_eq!(outcome.returned_units, 5);

    let rows = all(&repo).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, 10);
    assert_eq!(rows[0].status, EquipmentStatus::InStock);

    let logs = repo
        .logs
        .list(&LogQuery {
            kind: Some(LogKind::SiteReturn),
            actor: None,
            limit: None,
        })
        .await
        .unwrap();
    assert_eq!(logs.len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn stale_version_is_refused(pool: PgPool) {
    let repo = Repository::new(pool);
    let stock = register(&repo, "SM58", 10).await;

    let mut request = send_out(&stock, 1, EquipmentStatus::Rented, "Acme", day(2024, 5, 9));
    request.expected_version = stock.version + 1;
    let err = repo.equipment.move_units(&request, ACTOR).await.unwrap_err();
    assert!(matches!(err, AppError::StaleVersion(_)));

    let err = repo
        .equipment
        .delete(stock.id, Some(stock.version - 1), ACTOR)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StaleVersion(_)));

    assert_eq!(all(&repo).await[0].quantity, 10);
}

#[sqlx::test(migrations = "./migrations")]
async fn approving_deletion_of_rented_gear_is_refused(pool: PgPool) {
    let repo = Repository::new(pool);
    let stock = register(&repo, "SM58", 2).await;
    let rented = repo
        .equipment
        .move_units(&send_out(&stock, 2, EquipmentStatus::Rented, "Acme", day(2024, 5, 9)), ACTOR)
        .await
        .unwrap();

    let request = repo
        .deletions
        .create(rented.moved.id, "staff", Some("lost"))
        .await
        .unwrap();
    let err = repo.deletions.resolve(request.id, true, "admin").await.unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));

    assert_eq!(repo.equipment.get_by_id(rented.moved.id).await.unwrap().quantity, 2);
    let pending = repo.deletions.list(None).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].status.as_str(), "pending");
}

#[sqlx::test(migrations = "./migrations")]
async fn import_merges_stock_and_reports_bad_rows(pool: PgPool) {
    let repo = Repository::new(pool);
    register(&repo, "SM58", 2).await;

    let csv = "name,quantity,brand,status,borrower\n\
               SM58,3,Shure,in_stock,\n\
               sm58 ,1,shure,,\n\
               Beta 91,0,Shure,in_stock,\n\
               Beta 91,1,Shure,rented,Acme\n";
    let mut report = ImportReport::default();
    let rows = parse_equipment(csv.as_bytes(), &mut report).unwrap();
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].row, 3);

    repo.equipment.import(&rows, ACTOR, &mut report).await.unwrap();
    assert_eq!(report.merged, 2);
    assert_eq!(report.imported, 1);

    let rows = all(&repo).await;
    assert_eq!(rows.len(), 2);
    let stock = rows.iter().find(|r| r.status == EquipmentStatus::InStock).unwrap();
    assert_eq!(stock.quantity, 6);
    let rented = rows.iter().find(|r| r.status == EquipmentStatus::Rented).unwrap();
    assert_eq!(rented.borrower.as_deref(), Some("Acme"));
}

#[sqlx::test(migrations = "./migrations")]
async fn import_past_the_unit_limit_is_refused(pool: PgPool) {
    let repo = Repository::new(pool);

    let huge = vec![
        imported("A", 2_000_000_000, EquipmentStatus::InStock, None),
        imported("B", 2_000_000_000, EquipmentStatus::InStock, None),
    ];
    let err = repo
        .equipment
        .import(&huge, ACTOR, &mut ImportReport::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
    assert!(all(&repo).await.is_empty());

    register(&repo, "SM58", 2_000_000_000).await;
    let err = repo
        .equipment
        .import(
            &[imported("SM58", 200_000_000, EquipmentStatus::InStock, None)],
            ACTOR,
            &mut ImportReport::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BusinessRule(_)));
    assert_eq!(all(&repo).await[0].quantity, 2_000_000_000);
}

#[sqlx::test(migrations = "./migrations")]
async fn overdue_filter_works_both_ways(pool: PgPool) {
    let repo = Repository::new(pool);
    let stock = register(&repo, "SM58", 5).await;
    repo.equipment
        .move_units(&send_out(&stock, 2, EquipmentStatus::Rented, "Acme", day(2024, 5, 3)), ACTOR)
        .await
        .unwrap();

    let today = day(2024, 5, 10);
    let overdue = repo
        .equipment
        .list(
            &EquipmentQuery {
                overdue: Some(true),
                ..Default::default()
            },
            today,
        )
        .await
        .unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0].status, EquipmentStatus::Rented);

    let on_time = repo
        .equipment
        .list(
            &EquipmentQuery {
                overdue: Some(false),
                ..Default::default()
            },
            today,
        )
        .await
        .unwrap();
    assert_eq!(on_time.len(), 1);
    assert_eq!(on_time[0].status, EquipmentStatus::InStock);
}
