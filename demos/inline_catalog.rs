use std::error::Error;

use costume_gallery::catalog::{Catalog, CatalogOptions};
use costume_gallery::pipeline::{self, CategoryFilter, Query, SortKey, SortOrder};
use costume_gallery::sheets::RecordSource;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let source = RecordSource::inline([
        vec!["1", "Rose Gown", "Dress", "M", "Red", "https://drive.google.com/file/d/ROSE/view", "Silk gown", "TRUE"],
        vec!["2", "Blue Cape", "Outerwear", "L", "Blue", "", "Wool cape", "FALSE"],
        vec!["3", "Amber Dress", "Dress", "S", "Amber", "", "", "TRUE"],
    ]);
    let catalog = Catalog::new(source, CatalogOptions::default());
    let snapshot = catalog.snapshot().await?;

    let query = Query {
        category: CategoryFilter::parse("Dress"),
        sort: SortKey::Size,
        order: SortOrder::Asc,
        ..Default::default()
    };

    println!("Categories: {:?}", pipeline::categories(snapshot.costumes()));
    for c in pipeline::apply(snapshot.costumes(), &query) {
        println!("{} {} {} {}", c.id, c.size, c.name, c.image_url);
    }

    Ok(())
}
