use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::catalog::{Catalog, CatalogOptions, Lookup};
use crate::export::{self, ExportOptions};
use crate::output::SiteOptions;
use crate::pipeline::{self, CategoryFilter, Query, SortKey, SortOrder};
use crate::sheets::RecordSource;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "costume_gallery_{}_{}",
        name,
        std::process::id()
    ))
}

fn write_rows(path: &PathBuf, rows: &[[&str; 3]]) {
    let values: Vec<Vec<&str>> = rows.iter().map(|r| r.to_vec()).collect();
    let doc = serde_json::json!({ "values": values });
    std::fs::write(path, doc.to_string()).unwrap();
}

#[tokio::test]
async fn end_to_end_category_then_name_sort() {
    let source = RecordSource::inline([
        vec!["1", "Zinnia", "A"],
        vec!["2", "Aster", "B"],
        vec!["3", "Begonia", "A"],
    ]);
    let catalog = Catalog::new(source, CatalogOptions::default());
    let snapshot = catalog.snapshot().await.unwrap();

    let query = Query {
        category: CategoryFilter::parse("A"),
        sort: SortKey::Name,
        order: SortOrder::Asc,
        ..Default::default()
    };
    let names: Vec<&str> = pipeline::apply(snapshot.costumes(), &query)
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(names, vec!["Begonia", "Zinnia"]);
    assert_eq!(pipeline::categories(snapshot.costumes()), vec!["all", "A", "B"]);
}

#[tokio::test]
async fn pipeline_is_pure_over_a_snapshot() {
    let source = RecordSource::inline([
        vec!["1", "b", "X", "L"],
        vec!["2", "a", "Y", "S"],
        vec!["3", "c", "X", "Q"],
    ]);
    let catalog = Catalog::new(source, CatalogOptions::default());
    let snapshot = catalog.snapshot().await.unwrap();
    let before = snapshot.costumes().to_vec();

    let query = Query {
        sort: SortKey::Size,
        order: SortOrder::Desc,
        ..Default::default()
    };
    let first = pipeline::apply(snapshot.costumes(), &query);
    let second = pipeline::apply(snapshot.costumes(), &query);
    assert_eq!(first, second);
    assert_eq!(snapshot.costumes(), before.as_slice());
}

#[tokio::test]
async fn stale_snapshot_is_served_while_refreshing() {
    let path = temp_path("stale.json");
    write_rows(&path, &[["1", "Old", "A"]]);

    let catalog = Catalog::new(
        RecordSource::FilePath(path.to_string_lossy().to_string()),
        CatalogOptions {
            revalidate: Duration::ZERO,
            ..CatalogOptions::default()
        },
    );
    let first = catalog.snapshot().await.unwrap();
    assert_eq!(first.costumes()[0].name, "Old");

    write_rows(&path, &[["1", "New", "A"], ["2", "Extra", "B"]]);
    let stale = catalog.snapshot().await.unwrap();
    assert_eq!(stale.len(), 1);

    let mut refreshed = false;
    for _ in 0..100 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if catalog.cached().await.map(|s| s.len()) == Some(2) {
            refreshed = true;
            break;
        }
    }
    std::fs::remove_file(&path).ok();
    assert!(refreshed, "background refresh never replaced the snapshot");
}

#[tokio::test]
async fn fresh_snapshot_is_not_refetched() {
    let path = temp_path("fresh.json");
    write_rows(&path, &[["1", "Old", "A"]]);

    let catalog = Catalog::new(
        RecordSource::FilePath(path.to_string_lossy().to_string()),
        CatalogOptions::default(),
    );
    catalog.snapshot().await.unwrap();
    write_rows(&path, &[["1", "New", "A"]]);
    tokio::time::sleep(Duration::from_millis(50)).await;

    let again = catalog.snapshot().await.unwrap();
    std::fs::remove_file(&path).ok();
    assert_eq!(again.costumes()[0].name, "Old");
}

#[tokio::test]
async fn unknown_id_triggers_one_blocking_refetch() {
    let path = temp_path("lookup.json");
    write_rows(&path, &[["1", "Gown", "A"]]);

    let catalog = Catalog::new(
        RecordSource::FilePath(path.to_string_lossy().to_string()),
        CatalogOptions::default(),
    );
    assert_eq!(catalog.ids().await.unwrap(), vec!["1"]);

    write_rows(&path, &[["1", "Gown", "A"], ["2", "Cape", "B"]]);
    match catalog.lookup("2").await.unwrap() {
        Lookup::Found(costume) => assert_eq!(costume.name, "Cape"),
        Lookup::NotFound => panic!("new id should be found after refetch"),
    }

    std::fs::remove_file(&path).ok();
}

#[tokio::test]
async fn row_added_after_a_miss_is_still_found() {
    let path = temp_path("after_miss.json");
    write_rows(&path, &[["1", "Gown", "A"]]);

    let catalog = Catalog::new(
        RecordSource::FilePath(path.to_string_lossy().to_string()),
        CatalogOptions::default(),
    );
    assert_eq!(catalog.lookup("nope").await.unwrap(), Lookup::NotFound);

    // The miss above spent this second's refetch budget.
    write_rows(&path, &[["1", "Gown", "A"], ["2", "Cape", "B"]]);
    let started = tokio::time::Instant::now();
    let found = catalog.lookup("2").await.unwrap();
    std::fs::remove_file(&path).ok();

    match found {
        Lookup::Found(costume) => assert_eq!(costume.name, "Cape"),
        Lookup::NotFound => panic!("row added after a miss should be found"),
    }
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn duplicate_ids_resolve_to_first_row() {
    let catalog = Catalog::new(
        RecordSource::inline([vec!["7", "First", "A"], vec!["7", "Second", "B"]]),
        CatalogOptions::default(),
    );
    match catalog.lookup("7").await.unwrap() {
        Lookup::Found(costume) => assert_eq!(costume.name, "First"),
        Lookup::NotFound => panic!("duplicate id should resolve"),
    }
    let snapshot = catalog.snapshot().await.unwrap();
    assert_eq!(snapshot.ids(), vec!["7"]);
    assert_eq!(snapshot.duplicate_ids(), vec!["7"]);
}

#[tokio::test]
async fn export_writes_listing_detail_pages_and_json() {
    let out_dir = temp_path("export");
    let catalog = Catalog::new(
        RecordSource::inline([
            vec!["c-1", "Rose", "A"],
            vec!["c-2", "Lily", "B"],
            vec!["bad/id", "Iris", "A"],
        ]),
        CatalogOptions::default(),
    );
    let summary = export::export_site(
        &catalog,
        &SiteOptions::default(),
        &ExportOptions {
            out_dir: out_dir.clone(),
            concurrency: 2,
            show_progress: false,
        },
    )
    .await
    .unwrap();

    assert_eq!(summary.pages, 4);
    assert_eq!(summary.skipped, vec!["bad/id".to_string()]);

    let index = std::fs::read_to_string(out_dir.join("index.html")).unwrap();
    assert!(index.contains("3点の衣装が見つかりました"));
    assert!(!index.contains("<form"));
    let detail = std::fs::read_to_string(out_dir.join("costumes/c-2/index.html")).unwrap();
    assert!(detail.contains("Lily"));
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(out_dir.join("costumes.json")).unwrap())
            .unwrap();
    assert_eq!(json["total"], 3);

    std::fs::remove_dir_all(&out_dir).ok();
}

#[test]
fn catalog_is_shareable_across_tasks() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<Arc<Catalog>>();
}
