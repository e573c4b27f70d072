//! Database-backed behaviour. Needs a disposable PostgreSQL in `TEST_DATABASE_URL`:
//! `cargo test --test db -- --ignored`

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::path::Path;
use std::str::FromStr;
use storefront::auth::{JwtConfig, JwtService};
use storefront::model::{OrderStatus, ReviewStatus, Role, User};
use storefront::pagination::Pagination;
use storefront::patch::Patch;
use storefront::service::catalog::{self, AttributeInput, NewProduct, ProductPatch, VariationInput};
use storefront::service::collections::{self, NewCollection};
use storefront::service::orders::{self, NewOrder, OrderPatch};
use storefront::service::reviews::{self, NewReview, ReviewFilter, ReviewPatch, Visibility};
use storefront::service::users::{self, NewUser};
use storefront::{app, ensure_database_exists, ensure_schema, AppConfig, AppError, AppState};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "db-test-secret-with-at-least-32-characters";

async fn pool() -> PgPool {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set for ignored tests");
    ensure_database_exists(&url).await.unwrap();
    let pool = PgPool::connect(&url).await.unwrap();
    ensure_schema(&pool).await.unwrap();
    pool
}

fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

async fn user(pool: &PgPool, role: Role) -> User {
    users::create(
        pool,
        NewUser {
            name: "Test".into(),
            email: format!("{}@example.com", unique("user")),
            password_hash: None,
            phone: None,
            role,
            google_id: None,
            profile_image: None,
        },
    )
    .await
    .unwrap()
}

fn variation(sku: &str, price: &str, attrs: &[(&str, &str)]) -> VariationInput {
    VariationInput {
        sku: sku.into(),
        price: Some(Decimal::from_str(price).unwrap()),
        usecase: None,
        attributes: attrs
            .iter()
            .map(|(n, v)| AttributeInput {
                name: n.to_string(),
                value: v.to_string(),
            })
            .collect(),
    }
}

fn product(variations: Vec<VariationInput>) -> NewProduct {
    NewProduct {
        name: unique("Lamp"),
        description: None,
        collection_id: None,
        slug: None,
        meta_title: None,
        meta_desc: None,
        variations,
    }
}

#[tokio::test]
#[ignore]
async fn attribute_names_and_values_are_shared() {
    let pool = pool().await;
    let attr = unique("Colour");
    let a = catalog::create_product(&pool, product(vec![variation("A-1", "10", &[(&attr, "Red")])]), &[])
        .await
        .unwrap();
    let b = catalog::create_product(&pool, product(vec![variation("B-1", "12", &[(&attr, "Red")])]), &[])
        .await
        .unwrap();
    let pa = &a.variations[0].attributes[0];
    let pb = &b.variations[0].attributes[0];
    assert_eq!(pa.attribute_id, pb.attribute_id);
    assert_eq!(pa.value_id, pb.value_id);

    let listed = catalog::list_attributes(&pool).await.unwrap();
    let entry = listed.iter().find(|x| x.name == attr).unwrap();
    assert_eq!(entry.values.len(), 1);
}

#[tokio::test]
#[ignore]
async fn product_delete_removes_rows_and_reports_files() {
    let pool = pool().await;
    let images = vec![vec!["products/variations/a.jpg".to_string(), "products/variations/b.jpg".to_string()]];
    let created = catalog::create_product(
        &pool,
        product(vec![variation("S-1", "5", &[("Size", "M")]), variation("S-2", "6", &[("Size", "L")])]),
        &images,
    )
    .await
    .unwrap();
    let variation_ids: Vec<Uuid> = created.variations.iter().map(|v| v.variation.id).collect();
    let first = &created.variations[0];
    assert_eq!(first.images.len(), 2);
    assert_eq!(first.images.iter().filter(|i| i.is_primary).count(), 1);
    assert!(created.variations[1].images.is_empty());

    let mut files = catalog::delete_product(&pool, created.product.id).await.unwrap().unwrap();
    files.sort();
    assert_eq!(files, images[0]);
    assert!(catalog::find(&pool, created.product.id).await.unwrap().is_none());
    let left: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM product_variations WHERE product_id = $1")
        .bind(created.product.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(left, 0);
    for table in ["product_images", "variation_attribute_maps"] {
        let left: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {} WHERE variation_id = ANY($1)", table))
            .bind(&variation_ids)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(left, 0, "{}", table);
    }
    assert!(catalog::delete_product(&pool, created.product.id).await.unwrap().is_none());
}

#[tokio::test]
#[ignore]
async fn order_total_uses_first_variation_price() {
    let pool = pool().await;
    let owner = user(&pool, Role::StoreOwner).await;
    let created = catalog::create_product(
        &pool,
        product(vec![variation("P-1", "50.00", &[]), variation("P-2", "99.00", &[])]),
        &[],
    )
    .await
    .unwrap();
    let order = orders::create(
        &pool,
        owner.id,
        NewOrder {
            product_id: created.product.id,
            quantity: 2,
            user_id: None,
            notes: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(order.total_amount.to_string(), "100.00");
    assert_eq!(order.status, OrderStatus::Pending);
    assert!(order.order_number.starts_with("ORD-"));
}

#[tokio::test]
#[ignore]
async fn customers_cannot_place_orders() {
    let pool = pool().await;
    let customer = user(&pool, Role::Customer).await;
    let created = catalog::create_product(&pool, product(vec![variation("C-1", "1", &[])]), &[])
        .await
        .unwrap();
    let err = orders::create(
        &pool,
        customer.id,
        NewOrder {
            product_id: created.product.id,
            quantity: 1,
            user_id: None,
            notes: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
#[ignore]
async fn decided_orders_cannot_change() {
    let pool = pool().await;
    let owner = user(&pool, Role::StoreOwner).await;
    let admin = user(&pool, Role::Admin).await;
    let created = catalog::create_product(&pool, product(vec![variation("D-1", "3", &[])]), &[])
        .await
        .unwrap();
    let order = orders::create(
        &pool,
        owner.id,
        NewOrder {
            product_id: created.product.id,
            quantity: 1,
            user_id: None,
            notes: None,
        },
    )
    .await
    .unwrap();

    let approved = orders::approve(&pool, order.id, admin.id).await.unwrap();
    assert_eq!(approved.status, OrderStatus::Approved);
    assert_eq!(approved.approved_by, Some(admin.id));
    assert!(approved.approved_at.is_some());

    let err = orders::reject(&pool, order.id, admin.id, Some("late".into())).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidState(_)));
    assert!(matches!(orders::delete(&pool, order.id).await, Err(AppError::InvalidState(_))));
    assert_eq!(
        orders::find(&pool, order.id).await.unwrap().unwrap().status,
        OrderStatus::Approved
    );
}

#[tokio::test]
#[ignore]
async fn only_approved_reviews_are_public() {
    let pool = pool().await;
    let created = catalog::create_product(&pool, product(vec![variation("R-1", "1", &[])]), &[])
        .await
        .unwrap();
    let review = reviews::submit(
        &pool,
        NewReview {
            store_id: None,
            product_id: Some(created.product.id),
            name: "Ann".into(),
            email: "ann@example.com".into(),
            rating: Some(5),
            comment: None,
        },
    )
    .await
    .unwrap();
    assert_eq!(review.status, ReviewStatus::Pending);

    let filter = ReviewFilter {
        product_id: Some(created.product.id),
        ..ReviewFilter::default()
    };
    let page = Pagination { page: 1, limit: 10 };
    assert!(reviews::find(&pool, review.id, Visibility::ApprovedOnly).await.unwrap().is_none());
    assert_eq!(reviews::list(&pool, &filter, Visibility::ApprovedOnly, &page).await.unwrap().1, 0);

    let patch = ReviewPatch {
        status: Patch::Value(ReviewStatus::Approved),
        ..ReviewPatch::default()
    };
    reviews::update(&pool, review.id, patch).await.unwrap().unwrap();
    assert!(reviews::find(&pool, review.id, Visibility::ApprovedOnly).await.unwrap().is_some());
    assert_eq!(reviews::list(&pool, &filter, Visibility::ApprovedOnly, &page).await.unwrap().1, 1);
}

fn new_order(product_id: Uuid, quantity: i32) -> NewOrder {
    NewOrder {
        product_id,
        quantity,
        user_id: None,
        notes: None,
    }
}

#[tokio::test]
#[ignore]
async fn rejecting_records_notes_and_decider() {
    let pool = pool().await;
    let owner = user(&pool, Role::StoreOwner).await;
    let admin = user(&pool, Role::Admin).await;
    let created = catalog::create_product(&pool, product(vec![variation("J-1", "3", &[])]), &[])
        .await
        .unwrap();
    let order = orders::create(&pool, owner.id, new_order(created.product.id, 1)).await.unwrap();

    let rejected = orders::reject(&pool, order.id, admin.id, Some("out of stock".into()))
        .await
        .unwrap();
    assert_eq!(rejected.status, OrderStatus::Rejected);
    assert_eq!(rejected.admin_notes.as_deref(), Some("out of stock"));
    assert_eq!(rejected.approved_by, Some(admin.id));
    assert!(rejected.approved_at.is_some());
    assert!(matches!(
        orders::approve(&pool, order.id, admin.id).await,
        Err(AppError::InvalidState(_))
    ));
}

#[tokio::test]
#[ignore]
async fn quantity_change_recomputes_the_total() {
    let pool = pool().await;
    let owner = user(&pool, Role::StoreOwner).await;
    let created = catalog::create_product(&pool, product(vec![variation("Q-1", "50.00", &[])]), &[])
        .await
        .unwrap();
    let order = orders::create(&pool, owner.id, new_order(created.product.id, 2)).await.unwrap();
    assert_eq!(order.total_amount.to_string(), "100.00");

    let patch = OrderPatch {
        quantity: Patch::Value(3),
        ..OrderPatch::default()
    };
    let order = orders::update(&pool, order.id, patch).await.unwrap().unwrap();
    assert_eq!(order.total_amount.to_string(), "150.00");

    let patch = OrderPatch {
        notes: Patch::Value("leave at the door".into()),
        ..OrderPatch::default()
    };
    let order = orders::update(&pool, order.id, patch).await.unwrap().unwrap();
    assert_eq!(order.total_amount.to_string(), "150.00");
    assert_eq!(order.notes.as_deref(), Some("leave at the door"));

    // Without its product the stored unit price is used.
    catalog::delete_product(&pool, created.product.id).await.unwrap().unwrap();
    let patch = OrderPatch {
        quantity: Patch::Value(1),
        ..OrderPatch::default()
    };
    let order = orders::update(&pool, order.id, patch).await.unwrap().unwrap();
    assert_eq!(order.product_id, None);
    assert_eq!(order.total_amount.to_string(), "50.00");
}

#[tokio::test]
#[ignore]
async fn oversized_amounts_are_validation_errors() {
    let pool = pool().await;
    let owner = user(&pool, Role::StoreOwner).await;
    let created = catalog::create_product(&pool, product(vec![variation("O-1", "50.00", &[])]), &[])
        .await
        .unwrap();
    let err = orders::create(&pool, owner.id, new_order(created.product.id, 1_000_000_000))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = catalog::create_product(&pool, product(vec![variation("O-2", "100000000000", &[])]), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err: AppError = sqlx::query("SELECT $1::uuid")
        .bind("garbage")
        .execute(&pool)
        .await
        .unwrap_err()
        .into();
    assert_eq!(err.status_and_code(), (StatusCode::BAD_REQUEST, "validation_error"));
}

#[tokio::test]
#[ignore]
async fn null_patch_clears_product_fields() {
    let pool = pool().await;
    let collection = collections::create(
        &pool,
        NewCollection {
            name: unique("Lighting"),
            description: None,
        },
        None,
    )
    .await
    .unwrap();
    let mut input = product(vec![variation("N-1", "1", &[])]);
    input.description = Some("Warm light".into());
    input.collection_id = Some(collection.id);
    let created = catalog::create_product(&pool, input, &[]).await.unwrap();
    assert_eq!(created.product.collection_id, Some(collection.id));

    let patch = ProductPatch {
        description: Patch::Null,
        collection_id: Patch::Null,
        ..ProductPatch::default()
    };
    catalog::update(&pool, created.product.id, patch).await.unwrap().unwrap();
    let stored = catalog::find(&pool, created.product.id).await.unwrap().unwrap();
    assert_eq!(stored.product.description, None);
    assert_eq!(stored.product.collection_id, None);
    assert_eq!(stored.product.name, created.product.name);
}

#[tokio::test]
#[ignore]
async fn submitted_reviews_start_pending_whatever_the_body_says() {
    let pool = pool().await;
    let created = catalog::create_product(&pool, product(vec![variation("V-1", "1", &[])]), &[])
        .await
        .unwrap();
    let input: NewReview = serde_json::from_value(json!({
        "productId": created.product.id,
        "name": "Ann",
        "email": "ann@example.com",
        "rating": 4,
        "status": "approved"
    }))
    .unwrap();
    let review = reviews::submit(&pool, input).await.unwrap();
    assert_eq!(review.status, ReviewStatus::Pending);
}

fn router(pool: PgPool, upload_dir: &Path) -> Router {
    let mut config = AppConfig::with_secret(SECRET);
    config.upload.dir = upload_dir.to_path_buf();
    app(AppState::new(pool, config).unwrap())
}

fn admin_token(admin: &User) -> String {
    JwtService::new(JwtConfig {
        secret: SECRET.into(),
        expiration_hours: 1,
        issuer: "storefront".into(),
    })
    .generate_token(&admin.id.to_string(), &admin.email, "admin")
    .unwrap()
}

fn png() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([200, 40, 40]));
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

const BOUNDARY: &str = "storefront-test-boundary";

/// `data` JSON part followed by one PNG part per field name.
fn multipart_body(data: &Value, files: &[&str]) -> Body {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"data\"\r\n\r\n{}\r\n",
            data
        )
        .as_bytes(),
    );
    for name in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"a.png\"\r\n\
                 Content-Type: image/png\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&png());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    Body::from(body)
}

fn files_under(dir: &Path) -> usize {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return 0;
    };
    entries
        .map(|e| e.unwrap().path())
        .map(|p| if p.is_dir() { files_under(&p) } else { 1 })
        .sum()
}

async fn post_product(router: Router, token: &str, data: &Value, files: &[&str]) -> (StatusCode, Value) {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/products")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(multipart_body(data, files))
        .unwrap();
    let res = router.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
#[ignore]
async fn product_create_over_http_stores_variation_images() {
    let pool = pool().await;
    let admin = user(&pool, Role::Admin).await;
    let dir = tempfile::tempdir().unwrap();
    let data = json!({"name": unique("Lamp"), "variations": [{"sku": "H-1", "price": "9.50"}]});

    let (status, body) = post_product(router(pool, dir.path()), &admin_token(&admin), &data, &["variationImages[0]"]).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let images = body["data"]["variations"][0]["images"].as_array().unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(files_under(dir.path()), 1);
}

#[tokio::test]
#[ignore]
async fn unexpected_file_fields_leave_nothing_on_disk() {
    let pool = pool().await;
    let admin = user(&pool, Role::Admin).await;
    let dir = tempfile::tempdir().unwrap();
    let data = json!({"name": unique("Lamp"), "variations": [{"sku": "H-2", "price": "9.50"}]});

    let (status, body) = post_product(
        router(pool, dir.path()),
        &admin_token(&admin),
        &data,
        &["variationImages[0]", "logo"],
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "validation_error");
    assert_eq!(files_under(dir.path()), 0);
}
