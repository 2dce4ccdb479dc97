mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;
use tower::ServiceExt;

use common::{shipping_json, spawn_app};

#[tokio::test]
async fn catalog_is_public_and_hides_inactive_products() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let admin = app.admin_token().await?;
    let visible = app.seed_product(&admin, 1_000, 10, 5).await?;
    let hidden = app.seed_product(&admin, 2_000, 0, 5).await?;
    let (status, _) = app
        .request(Method::PUT, &format!("/products/{hidden}"), Some(&admin), Some(json!({"is_active": false})))
        .await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/products", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["id"], visible.as_str());
    assert_eq!(body["data"]["items"][0]["final_price_cents"], 900);

    let (_, body) = app.get("/products?include_inactive=true", None).await?;
    assert_eq!(body["data"]["total"], 1);
    let (_, body) = app.get("/products?include_inactive=true", Some(&admin)).await?;
    assert_eq!(body["data"]["total"], 2);

    let (status, _) = app.get(&format!("/products/{hidden}"), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = app.get(&format!("/products/{visible}"), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["images"], json!([]));

    let (_, body) = app.get("/products?include_inactive=true&sort=price_desc&min_price=500", Some(&admin)).await?;
    assert_eq!(body["data"]["items"][0]["price_cents"], 2_000);
    Ok(())
}

#[tokio::test]
async fn category_with_products_cannot_be_deleted() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let admin = app.admin_token().await?;
    let product = app.seed_product(&admin, 500, 0, 1).await?;
    let (_, body) = app.get(&format!("/products/{product}"), None).await?;
    let category = body["data"]["category_id"].as_str().unwrap_or_default().to_string();

    let (status, _) = app.request(Method::DELETE, &format!("/categories/{category}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, body) = app.request(Method::DELETE, &format!("/products/{product}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "deleted");
    let (status, _) = app.request(Method::DELETE, &format!("/categories/{category}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/categories/{category}"), None).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn order_reserves_stock_and_cancel_restores_it() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let admin = app.admin_token().await?;
    let product = app.seed_product(&admin, 1_000, 10, 3).await?;
    let customer = app.sign_up("buyer@example.com").await?;

    let (status, order) = app
        .post("/orders", Some(&customer), json!({"items": [{"product_id": product, "quantity": 2}], "shipping": shipping_json()}))
        .await?;
    assert_eq!(status, StatusCode::OK, "{order}");
    assert_eq!(order["data"]["status"], "pending");
    assert_eq!(order["data"]["payment_status"], "unpaid");
    assert_eq!(order["data"]["total_cents"], 1_800);
    assert_eq!(order["data"]["items"].as_array().map(Vec::len), Some(1));
    let order_id = order["data"]["id"].as_str().unwrap_or_default().to_string();

    let (_, p) = app.get(&format!("/products/{product}"), None).await?;
    assert_eq!(p["data"]["stock"], 1);

    let (status, body) = app
        .post("/orders", Some(&customer), json!({"items": [{"product_id": product, "quantity": 2}], "shipping": shipping_json()}))
        .await?;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");
    let (_, p) = app.get(&format!("/products/{product}"), None).await?;
    assert_eq!(p["data"]["stock"], 1);

    let (status, _) = app.post("/orders", Some(&customer), json!({"items": [], "shipping": shipping_json()})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, mine) = app.get("/orders", Some(&customer)).await?;
    assert_eq!(mine["data"]["total"], 1);

    let stranger = app.sign_up("stranger@example.com").await?;
    let (status, _) = app.get(&format!("/orders/{order_id}"), Some(&stranger)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app.get(&format!("/orders/{order_id}"), Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, cancelled) = app.post(&format!("/orders/{order_id}/cancel"), Some(&customer), json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cancelled["data"]["status"], "cancelled");
    let (_, p) = app.get(&format!("/products/{product}"), None).await?;
    assert_eq!(p["data"]["stock"], 3);

    let (status, _) = app.post(&format!("/orders/{order_id}/cancel"), Some(&customer), json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert!(app.mailer.sent().iter().any(|m| m.to == "buyer@example.com" && m.subject.contains("Order")));
    Ok(())
}

#[tokio::test]
async fn admin_moves_orders_forward_only() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let admin = app.admin_token().await?;
    let product = app.seed_product(&admin, 700, 0, 10).await?;
    let customer = app.sign_up("status@example.com").await?;
    let (_, order) = app
        .post("/orders", Some(&customer), json!({"items": [{"product_id": product, "quantity": 1}], "shipping": shipping_json()}))
        .await?;
    let id = order["data"]["id"].as_str().unwrap_or_default().to_string();
    let uri = format!("/admin/orders/{id}/status");

    let (status, body) = app.request(Method::PUT, &uri, Some(&admin), Some(json!({"status": "processing"}))).await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["status"], "processing");
    let (status, _) = app.request(Method::PUT, &uri, Some(&admin), Some(json!({"status": "pending"}))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.post(&format!("/orders/{id}/cancel"), Some(&customer), json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, listed) = app.get("/admin/orders?status=processing", Some(&admin)).await?;
    assert_eq!(listed["data"]["total"], 1);
    let (_, listed) = app.get("/admin/orders?status=shipped", Some(&admin)).await?;
    assert_eq!(listed["data"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn checkout_confirm_marks_order_paid() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let admin = app.admin_token().await?;
    let product = app.seed_product(&admin, 1_250, 0, 10).await?;
    let customer = app.sign_up("payer@example.com").await?;
    let (_, order) = app
        .post("/orders", Some(&customer), json!({"items": [{"product_id": product, "quantity": 2}], "shipping": shipping_json()}))
        .await?;
    let order_id = order["data"]["id"].as_str().unwrap_or_default().to_string();

    let other = app.sign_up("other@example.com").await?;
    let (status, _) = app.post(&format!("/checkout/{order_id}"), Some(&other), json!({})).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, session) = app.post(&format!("/checkout/{order_id}"), Some(&customer), json!({})).await?;
    assert_eq!(status, StatusCode::OK, "{session}");
    let session_id = session["data"]["session_id"].as_str().unwrap_or_default().to_string();
    assert!(session["data"]["url"].as_str().unwrap_or_default().contains(&session_id));
    let sent = app.payments.request(&session_id).expect("session recorded");
    assert_eq!(sent.lines.iter().map(|l| l.unit_amount * l.quantity as i64).sum::<i64>(), 2_500);

    let (status, outcome) = app.post(&format!("/checkout/confirm/{session_id}"), Some(&customer), json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["data"]["paid"], false);

    app.payments.pay(&session_id);
    let (_, outcome) = app.post(&format!("/checkout/confirm/{session_id}"), Some(&customer), json!({})).await?;
    assert_eq!(outcome["data"]["paid"], true);
    assert_eq!(outcome["data"]["order_id"], order_id.as_str());

    let (_, order) = app.get(&format!("/orders/{order_id}"), Some(&customer)).await?;
    assert_eq!(order["data"]["payment_status"], "paid");
    let (status, _) = app.post(&format!("/checkout/{order_id}"), Some(&customer), json!({})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, summary) = app.get("/admin/statistics/summary", Some(&admin)).await?;
    assert_eq!(summary["data"]["paid_revenue_cents"], 2_500);
    assert_eq!(summary["data"]["orders"], 1);
    Ok(())
}

#[tokio::test]
async fn statistics_group_sales_and_rank_products() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let admin = app.admin_token().await?;
    let lamp = app.seed_product(&admin, 1_000, 0, 50).await?;
    let desk = app.seed_product(&admin, 5_000, 0, 50).await?;
    let customer = app.sign_up("stats@example.com").await?;
    for (product, qty) in [(&lamp, 3), (&desk, 1), (&lamp, 2)] {
        let (status, _) = app
            .post("/orders", Some(&customer), json!({"items": [{"product_id": product, "quantity": qty}], "shipping": shipping_json()}))
            .await?;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, rows) = app.get("/admin/statistics/sales?grouping=all_time", Some(&admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rows["data"][0]["orders"], 3);
    assert_eq!(rows["data"][0]["items_sold"], 6);
    assert_eq!(rows["data"][0]["revenue_cents"], 10_000);

    let (_, top) = app.get("/admin/statistics/top-products?limit=1", Some(&admin)).await?;
    assert_eq!(top["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(top["data"][0]["product_id"], lamp.as_str());

    let (status, _) = app.get("/admin/statistics/sales?from=2024-02-01&to=2024-01-01", Some(&admin)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, rows) = app.get("/admin/statistics/sales?grouping=day&from=2000-01-01&to=2000-12-31", Some(&admin)).await?;
    assert_eq!(rows["data"], json!([]));

    let (status, _) = app.get("/admin/statistics/summary", Some(&customer)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn wishlist_is_idempotent_and_per_user() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let admin = app.admin_token().await?;
    let product = app.seed_product(&admin, 300, 0, 1).await?;
    let token = app.sign_up("wisher@example.com").await?;

    for _ in 0..2 {
        let (status, _) = app.post("/wishlist", Some(&token), json!({"product_id": product})).await?;
        assert_eq!(status, StatusCode::OK);
    }
    let (_, list) = app.get("/wishlist", Some(&token)).await?;
    assert_eq!(list["data"].as_array().map(Vec::len), Some(1));
    assert_eq!(list["data"][0]["product"]["id"], product.as_str());

    let (_, other) = app.get("/wishlist", Some(&admin)).await?;
    assert_eq!(other["data"], json!([]));

    let (status, _) = app.post("/wishlist", Some(&token), json!({"product_id": uuid::Uuid::new_v4()})).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.request(Method::DELETE, &format!("/wishlist/{product}"), Some(&token), None).await?;
    assert_eq!(status, StatusCode::OK);
    let (_, list) = app.get("/wishlist", Some(&token)).await?;
    assert_eq!(list["data"], json!([]));

    app.post("/wishlist", Some(&token), json!({"product_id": product})).await?;
    let (_, cleared) = app.request(Method::DELETE, "/wishlist", Some(&token), None).await?;
    assert_eq!(cleared["data"], 1);
    Ok(())
}

#[tokio::test]
async fn support_requests_reach_the_inbox() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (status, body) = app
        .post("/support", None, json!({"name": "Ivan", "email": "ivan@example.com", "subject": "Late parcel", "message": "Where is my order?"}))
        .await?;
    assert_eq!(status, StatusCode::OK, "{body}");
    let id = body["data"]["id"].as_str().unwrap_or_default().to_string();
    assert!(app.mailer.sent().iter().any(|m| m.to == "support@shop.test" && m.subject.contains("Late parcel")));

    let (status, _) = app.post("/support", None, json!({"name": "", "email": "x@example.com", "subject": "s", "message": "m"})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let admin = app.admin_token().await?;
    let (_, open) = app.get("/admin/support?status=open", Some(&admin)).await?;
    assert_eq!(open["data"]["total"], 1);
    let (status, resolved) = app.post(&format!("/admin/support/{id}/resolve"), Some(&admin), json!({})).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(resolved["data"]["status"], "resolved");
    let (_, open) = app.get("/admin/support?status=open", Some(&admin)).await?;
    assert_eq!(open["data"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn newsletter_subscribe_and_broadcast() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    for email in ["reader@example.com", "Reader@Example.com", "second@example.com"] {
        let (status, _) = app.post("/newsletter/subscribe", None, json!({"email": email})).await?;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, _) = app.post("/newsletter/subscribe", None, json!({"email": "not-an-email"})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (_, body) = app.post("/newsletter/unsubscribe", None, json!({"email": "second@example.com"})).await?;
    assert_eq!(body["message"], "unsubscribed");

    let admin = app.admin_token().await?;
    let (_, subs) = app.get("/admin/newsletter", Some(&admin)).await?;
    assert_eq!(subs["data"]["total"], 1);

    app.mailer.fail_for("nobody@example.com");
    let (status, report) = app
        .post("/admin/newsletter/broadcast", Some(&admin), json!({"subject": "Spring sale", "html": "<p>-20%</p>"}))
        .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["data"], json!({"sent": 1, "failed": 0}));
    Ok(())
}

#[tokio::test]
async fn shipping_lookup_delegates_to_directory() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let (status, cities) = app.get("/shipping/cities?q=ky", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cities["data"][0]["ref"], "kyiv-ref");
    let (status, warehouses) = app.get("/shipping/warehouses?city_ref=kyiv-ref", None).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(warehouses["data"][0]["number"], "1");
    let (status, body) = app.get("/shipping/warehouses?city_ref=unknown", None).await?;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["success"], false);
    Ok(())
}

fn multipart(content_type: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "storefront-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"upload\"\r\nContent-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}

#[tokio::test]
async fn product_images_upload_serve_and_delete() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let admin = app.admin_token().await?;
    let product = app.seed_product(&admin, 900, 0, 1).await?;
    let png = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR".to_vec();

    let upload = |content_type: &str, bytes: &[u8]| {
        let (ct, body) = multipart(content_type, bytes);
        Request::builder()
            .method(Method::POST)
            .uri(format!("/products/{product}/images"))
            .header(header::AUTHORIZATION, format!("Bearer {admin}"))
            .header(header::CONTENT_TYPE, ct)
            .body(Body::from(body))
    };

    let resp = app.router.clone().oneshot(upload("image/png", &png)?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let image = common::read_json(resp).await?;
    let url = image["data"]["url"].as_str().unwrap_or_default().to_string();
    assert!(url.starts_with("/static/images/") && url.ends_with(".png"), "{url}");

    let resp = app.router.clone().oneshot(Request::builder().uri(&url).body(Body::empty())?).await?;
    assert_eq!(resp.status(), StatusCode::OK);
    let served = axum::body::to_bytes(resp.into_body(), usize::MAX).await?;
    assert_eq!(served.as_ref(), png.as_slice());

    let resp = app.router.clone().oneshot(upload("image/png", b"plain text, not an image")?).await?;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let (_, listed) = app.get(&format!("/products/{product}/images"), None).await?;
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));
    let image_id = image["data"]["id"].as_str().unwrap_or_default().to_string();
    let (status, _) = app.request(Method::DELETE, &format!("/images/{image_id}"), Some(&admin), None).await?;
    assert_eq!(status, StatusCode::OK);
    let resp = app.router.clone().oneshot(Request::builder().uri(&url).body(Body::empty())?).await?;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn malformed_requests_get_json_failures() -> anyhow::Result<()> {
    let app = spawn_app().await?;
    let admin = app.admin_token().await?;
    let shopper = app.sign_up("strict@example.com").await?;

    let (status, body) = app.post("/orders", Some(&shopper), json!({"items": "nope"})).await?;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false, "{body}");
    assert!(body["message"].as_str().unwrap_or_default().starts_with("Invalid Body"));

    let (status, body) = app.get("/products/not-a-uuid", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false, "{body}");
    assert!(body["message"].as_str().unwrap_or_default().starts_with("Invalid Path"));

    let (status, body) = app.get("/products?min_price=cheap", None).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false, "{body}");
    assert!(body["message"].as_str().unwrap_or_default().starts_with("Invalid Query"));

    let product_id = app.seed_product(&admin, 1_000, 0, 1).await?;
    let (status, body) = app.post(&format!("/products/{product_id}/images"), Some(&admin), json!({"file": "x"})).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false, "{body}");
    Ok(())
}
