mod common;

use axum::{
    http::{Method, StatusCode},
    Router,
};
use common::*;
use futures::future::join_all;
use rstest::rstest;
use serde_json::{json, Value};

const TUTOR: &str = "tutor@example.com";
const STUDENT: &str = "student@example.com";

async fn publish(app: &Router, cookie: &str, listing: Value) -> String {
    let response = send(
        app,
        with_cookie(with_json(Method::POST, "/tutorials", listing), cookie),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED);
    response.body["insertedId"].as_str().unwrap().to_string()
}

async fn get_tutorial(app: &Router, id: &str) -> TestResponse {
    send(app, empty(Method::GET, &format!("/tutorials/{}", id))).await
}

mod listings {
    use super::*;

    #[rstest]
    #[tokio::test]
    async fn publishing_requires_a_session() {
        let app = create_test_app();
        let response = send(
            &app,
            with_json(
                Method::POST,
                "/tutorials",
                json!({"ownerEmail": TUTOR, "category": "Math"}),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }

    #[rstest]
    #[tokio::test]
    async fn published_listing_starts_without_reviews() {
        let app = create_test_app();
        let cookie = sign_in(&app, TUTOR).await;
        let id = publish(
            &app,
            &cookie,
            json!({"ownerEmail": TUTOR, "category": "Math", "price": 20, "reviewCount": 99}),
        )
        .await;

        let response = get_tutorial(&app, &id).await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["_id"], id);
        assert_eq!(response.body["ownerEmail"], TUTOR);
        assert_eq!(response.body["price"], 20);
        assert_eq!(response.body["reviewCount"], 0);
    }

    #[rstest]
    #[tokio::test]
    async fn listings_filter_by_category_and_owner() {
        let app = create_test_app();
        let cookie = sign_in(&app, TUTOR).await;
        publish(&app, &cookie, json!({"ownerEmail": TUTOR, "category": "Math"})).await;
        publish(&app, &cookie, json!({"ownerEmail": TUTOR, "category": "Music"})).await;
        publish(
            &app,
            &cookie,
            json!({"ownerEmail": "other@example.com", "category": "Math"}),
        )
        .await;

        let all = send(&app, empty(Method::GET, "/tutorials")).await;
        let math = send(&app, empty(Method::GET, "/tutorials?category=Math")).await;
        let mine = send(
            &app,
            with_cookie(empty(Method::GET, &format!("/my-tutorials/{}", TUTOR)), &cookie),
        )
        .await;

        assert_eq!(all.body.as_array().unwrap().len(), 3);
        let math = math.body.as_array().unwrap();
        assert_eq!(math.len(), 2);
        assert!(math.iter().all(|listing| listing["category"] == "Math"));
        assert_eq!(mine.status, StatusCode::OK);
        let mine = mine.body.as_array().unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|listing| listing["ownerEmail"] == TUTOR));
    }

    #[rstest]
    #[tokio::test]
    async fn missing_category_is_rejected() {
        let app = create_test_app();
        let cookie = sign_in(&app, TUTOR).await;
        let response = send(
            &app,
            with_cookie(
                with_json(
                    Method::POST,
                    "/tutorials",
                    json!({"ownerEmail": TUTOR, "category": " "}),
                ),
                &cookie,
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
    }

    #[rstest]
    #[case::unknown("6f1c2d3e-4b5a-4c6d-8e7f-0123456789ab", StatusCode::NOT_FOUND)]
    #[case::malformed("abc", StatusCode::BAD_REQUEST)]
    #[tokio::test]
    async fn get_reports_bad_references(#[case] id: &str, #[case] expected: StatusCode) {
        let app = create_test_app();
        assert_eq!(get_tutorial(&app, id).await.status, expected);
    }

    #[rstest]
    #[tokio::test]
    async fn revising_cannot_touch_the_review_count() {
        let app = create_test_app();
        let cookie = sign_in(&app, TUTOR).await;
        let id = publish(&app, &cookie, json!({"ownerEmail": TUTOR, "category": "Math"})).await;

        let response = send(
            &app,
            with_cookie(
                with_json(
                    Method::PUT,
                    &format!("/tutorials/{}", id),
                    json!({"category": "Physics", "reviewCount": 500}),
                ),
                &cookie,
            ),
        )
        .await;
        let review_only = send(
            &app,
            with_cookie(
                with_json(
                    Method::PUT,
                    &format!("/tutorials/{}", id),
                    json!({"reviewCount": 500}),
                ),
                &cookie,
            ),
        )
        .await;

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(review_only.status, StatusCode::BAD_REQUEST);
        let listing = get_tutorial(&app, &id).await.body;
        assert_eq!(listing["category"], "Physics");
        assert_eq!(listing["reviewCount"], 0);
    }

    #[rstest]
    #[case::null_category(json!({"category": null}))]
    #[case::numeric_owner(json!({"category": "Physics", "ownerEmail": 5}))]
    #[case::blank_owner(json!({"ownerEmail": ""}))]
    #[case::blank_category(json!({"category": "  "}))]
    #[tokio::test]
    async fn revising_keeps_required_fields_valid(#[case] fields: Value) {
        let app = create_test_app();
        let cookie = sign_in(&app, TUTOR).await;
        let id = publish(&app, &cookie, json!({"ownerEmail": TUTOR, "category": "Math"})).await;

        let response = send(
            &app,
            with_cookie(
                with_json(Method::PUT, &format!("/tutorials/{}", id), fields),
                &cookie,
            ),
        )
        .await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.body["error"].is_string());
        let listing = get_tutorial(&app, &id).await;
        assert_eq!(listing.status, StatusCode::OK);
        assert_eq!(listing.body["ownerEmail"], TUTOR);
        assert_eq!(listing.body["category"], "Math");
        let all = send(&app, empty(Method::GET, "/tutorials")).await;
        assert_eq!(all.status, StatusCode::OK);
    }

    #[rstest]
    #[tokio::test]
    async fn revised_owner_and_category_are_trimmed() {
        let app = create_test_app();
        let cookie = sign_in(&app, TUTOR).await;
        let id = publish(&app, &cookie, json!({"ownerEmail": TUTOR, "category": "Math"})).await;

        let response = send(
            &app,
            with_cookie(
                with_json(
                    Method::PUT,
                    &format!("/tutorials/{}", id),
                    json!({"ownerEmail": " new@example.com ", "category": " Art "}),
                ),
                &cookie,
            ),
        )
        .await;

        assert_eq!(response.status, StatusCode::OK);
        let listing = get_tutorial(&app, &id).await.body;
        assert_eq!(listing["ownerEmail"], "new@example.com");
        assert_eq!(listing["category"], "Art");
    }

    #[rstest]
    #[tokio::test]
    async fn listing_without_owner_is_a_bad_request() {
        let app = create_test_app();
        let cookie = sign_in(&app, TUTOR).await;
        let response = send(
            &app,
            with_cookie(
                with_json(Method::POST, "/tutorials", json!({"category": "Math"})),
                &cookie,
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert!(response.body["error"].is_string());
    }

    #[rstest]
    #[tokio::test]
    async fn withdrawn_listing_is_gone() {
        let app = create_test_app();
        let cookie = sign_in(&app, TUTOR).await;
        let id = publish(&app, &cookie, json!({"ownerEmail": TUTOR, "category": "Math"})).await;
        let uri = format!("/tutorials/{}", id);

        let first = send(&app, with_cookie(empty(Method::DELETE, &uri), &cookie)).await;
        let second = send(&app, with_cookie(empty(Method::DELETE, &uri), &cookie)).await;

        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(first.body["message"], "Tutorial deleted successfully");
        assert_eq!(second.status, StatusCode::NOT_FOUND);
        assert_eq!(get_tutorial(&app, &id).await.status, StatusCode::NOT_FOUND);
    }
}

mod reviews {
    use super::*;

    #[rstest]
    #[tokio::test]
    async fn each_review_counts_once() {
        let app = create_test_app();
        let cookie = sign_in(&app, TUTOR).await;
        let id = publish(&app, &cookie, json!({"ownerEmail": TUTOR, "category": "Math"})).await;
        let uri = format!("/update-review/{}", id);

        let first = send(&app, empty(Method::PATCH, &uri)).await;

        assert_eq!(first.status, StatusCode::OK);
        assert_eq!(first.body, json!({"_id": id, "reviewCount": 1}));
    }

    #[rstest]
    #[tokio::test]
    async fn concurrent_reviews_are_not_lost() {
        const REVIEWS: u64 = 20;
        let app = create_test_app();
        let cookie = sign_in(&app, TUTOR).await;
        let id = publish(&app, &cookie, json!({"ownerEmail": TUTOR, "category": "Math"})).await;
        let uri = format!("/update-review/{}", id);

        let responses = join_all((0..REVIEWS).map(|_| send(&app, empty(Method::PATCH, &uri)))).await;

        assert!(responses.iter().all(|r| r.status == StatusCode::OK));
        assert_eq!(get_tutorial(&app, &id).await.body["reviewCount"], REVIEWS);
    }

    #[rstest]
    #[tokio::test]
    async fn reviewing_an_unknown_listing_is_not_found() {
        let app = create_test_app();
        let response = send(
            &app,
            empty(
                Method::PATCH,
                "/update-review/6f1c2d3e-4b5a-4c6d-8e7f-0123456789ab",
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::NOT_FOUND);
    }
}

mod bookings {
    use super::*;

    #[rstest]
    #[tokio::test]
    async fn student_sees_own_bookings() {
        let app = create_test_app();
        let tutor = sign_in(&app, TUTOR).await;
        let id = publish(&app, &tutor, json!({"ownerEmail": TUTOR, "category": "Math"})).await;
        let student = sign_in(&app, STUDENT).await;

        let booked = send(
            &app,
            with_cookie(
                with_json(
                    Method::POST,
                    "/booked-tutor",
                    json!({"userEmail": STUDENT, "tutorialRef": id, "slot": "Monday"}),
                ),
                &student,
            ),
        )
        .await;
        let listed = send(
            &app,
            with_cookie(
                empty(Method::GET, &format!("/booked-tutorial/{}", STUDENT)),
                &student,
            ),
        )
        .await;

        assert_eq!(booked.status, StatusCode::CREATED);
        assert_eq!(listed.status, StatusCode::OK);
        let bookings = listed.body.as_array().unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0]["tutorialRef"], id);
        assert_eq!(bookings[0]["slot"], "Monday");
        assert_eq!(bookings[0]["_id"], booked.body["insertedId"]);
    }

    #[rstest]
    #[case::unknown("6f1c2d3e-4b5a-4c6d-8e7f-0123456789ab", StatusCode::NOT_FOUND)]
    #[case::malformed("tutorial-1", StatusCode::BAD_REQUEST)]
    #[tokio::test]
    async fn booking_needs_an_existing_tutorial(
        #[case] tutorial_ref: &str,
        #[case] expected: StatusCode,
    ) {
        let app = create_test_app();
        let student = sign_in(&app, STUDENT).await;

        let response = send(
            &app,
            with_cookie(
                with_json(
                    Method::POST,
                    "/booked-tutor",
                    json!({"userEmail": STUDENT, "tutorialRef": tutorial_ref}),
                ),
                &student,
            ),
        )
        .await;

        assert_eq!(response.status, expected);
    }

    #[rstest]
    #[tokio::test]
    async fn booking_requires_a_session() {
        let app = create_test_app();
        let response = send(
            &app,
            with_json(
                Method::POST,
                "/booked-tutor",
                json!({"userEmail": STUDENT, "tutorialRef": "x"}),
            ),
        )
        .await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    }
}
