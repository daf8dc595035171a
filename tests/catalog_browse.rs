use freshcart::{
    cart::store::CartStore,
    catalog::{
        provider::{CatalogConfig, CatalogError, CatalogProvider, StaticCatalog},
        record::CatalogRecord,
        selection::{Selection, SelectionError},
    },
    line::LineDraft,
    money::Rupees,
};

fn instant() -> CatalogConfig {
    CatalogConfig { latency_ms: 0 }
}

async fn record(catalog: &StaticCatalog, id: u64) -> CatalogRecord {
    catalog
        .fetch_catalog(None)
        .await
        .expect("catalog")
        .into_iter()
        .find(|r| r.id == id)
        .expect("record")
}

#[tokio::test]
async fn demo_catalog_lists_categories_in_order() {
    let catalog = StaticCatalog::demo(instant()).expect("demo");
    let names: Vec<String> = catalog
        .fetch_categories()
        .await
        .expect("categories")
        .into_iter()
        .map(|c| c.name)
        .collect();
    assert_eq!(names, vec!["Fish", "Chicken", "Mutton", "Fruits"]);
}

#[tokio::test]
async fn catalog_filters_by_category() {
    let catalog = StaticCatalog::demo(instant()).expect("demo");

    let all = catalog.fetch_catalog(None).await.expect("all");
    assert_eq!(all.len(), 8);

    let fish: Vec<u64> = catalog
        .fetch_catalog(Some(1))
        .await
        .expect("fish")
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(fish, vec![1, 5, 6, 7, 8]);

    assert!(catalog.fetch_catalog(Some(99)).await.expect("none").is_empty());
}

#[tokio::test]
async fn static_catalog_waits_for_configured_latency() {
    let catalog = StaticCatalog::demo(CatalogConfig { latency_ms: 30 }).expect("demo");
    let started = std::time::Instant::now();
    catalog.fetch_categories().await.expect("categories");
    assert!(started.elapsed() >= std::time::Duration::from_millis(30));
}

#[test]
fn malformed_catalog_document_is_a_decode_error() {
    let err = StaticCatalog::from_json("{\"categories\": 3}", instant()).expect_err("bad json");
    assert!(matches!(err, CatalogError::Decode(_)));
}

#[test]
fn missing_optional_fields_default() {
    let json = r#"{
        "categories": [{ "id": 1, "name": "Fish", "icon": "fish.png" }],
        "records": [{ "id": 9, "category_id": 1, "name": "Mackerel", "price": 349,
                      "mrp": 399, "image": "m.png", "stock": 0 }]
    }"#;
    let catalog = StaticCatalog::from_json(json, instant()).expect("decode");
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");
    let records = rt.block_on(catalog.fetch_catalog(None)).expect("records");
    assert_eq!(records[0].discount, 0);
    assert!(records[0].tags.is_empty());
    assert!(records[0].variants.is_empty());
    assert!(records[0].out_of_stock());
}

#[tokio::test]
async fn selection_is_capped_by_stock() {
    let catalog = StaticCatalog::demo(instant()).expect("demo");
    let hilsa = record(&catalog, 8).await;
    assert_eq!(hilsa.stock, 6);

    let mut selection = Selection::new();
    for expected in 1..=6 {
        assert_eq!(selection.add(&hilsa), Ok(expected));
    }
    assert!(!selection.can_add(&hilsa));
    assert_eq!(
        selection.add(&hilsa),
        Err(SelectionError::StockLimit { id: 8, stock: 6 })
    );
    assert_eq!(selection.count(8), 6);
}

#[tokio::test]
async fn selection_drops_entry_at_zero() {
    let catalog = StaticCatalog::demo(instant()).expect("demo");
    let fish = record(&catalog, 1).await;
    let fruit = record(&catalog, 4).await;

    let mut selection = Selection::new();
    selection.add(&fish).expect("add");
    selection.add(&fish).expect("add");
    selection.add(&fruit).expect("add");
    assert_eq!(selection.total_items(), 3);

    assert_eq!(selection.remove(1), Ok(1));
    assert_eq!(selection.remove(1), Ok(0));
    assert_eq!(selection.count(1), 0);
    assert_eq!(selection.remove(1), Err(SelectionError::NotSelected(1)));
    assert_eq!(selection.remove(4), Ok(0));
    assert!(selection.is_empty());
}

#[tokio::test]
async fn record_becomes_cart_draft_with_first_tag_as_variation() {
    let catalog = StaticCatalog::demo(instant()).expect("demo");
    let rohu = record(&catalog, 6).await;

    let mut cart = CartStore::new();
    let (line, _) = cart.add_or_increment(LineDraft::from(&rohu));
    assert_eq!(line.id, 6);
    assert_eq!(line.variation, "500 g");
    assert_eq!(line.unit_price, Rupees(199));
}

#[tokio::test]
async fn each_variant_gets_its_own_line_and_price() {
    let catalog = StaticCatalog::demo(instant()).expect("demo");
    let pomfret = record(&catalog, 5).await;
    let small = pomfret.variant(501).expect("300 g");
    let large = pomfret.variant(502).expect("600 g");

    let mut cart = CartStore::new();
    cart.add_or_increment(LineDraft::from_variant(&pomfret, small));
    let (line, _) = cart.add_or_increment(LineDraft::from_variant(&pomfret, large));
    assert_eq!(line.quantity, 1);
    assert_eq!(line.variation, "600 g");
    assert_eq!(line.unit_price, Rupees(949));

    cart.add_or_increment(LineDraft::from_variant(&pomfret, small));
    let lines: Vec<(u64, &str, u32)> = cart
        .active()
        .iter()
        .map(|l| (l.id, l.variation.as_str(), l.quantity))
        .collect();
    assert_eq!(lines, vec![(501, "300 g", 2), (502, "600 g", 1)]);
    assert_eq!(cart.compute_totals().expect("totals").subtotal, Rupees(499 * 2 + 949));
}

#[test]
fn colliding_variant_ids_are_rejected() {
    let json = r#"{
        "categories": [],
        "records": [
            { "id": 1, "category_id": 1, "name": "Fish", "price": 299, "mrp": 349,
              "image": "f.png", "stock": 3,
              "variants": [{ "id": 2, "name": "1 kg", "price": 569 }] },
            { "id": 2, "category_id": 2, "name": "Chicken", "price": 249, "mrp": 295,
              "image": "c.png", "stock": 3 }
        ]
    }"#;
    let err = StaticCatalog::from_json(json, instant()).expect_err("duplicate id");
    assert!(matches!(err, CatalogError::DuplicateId(2)));
}
