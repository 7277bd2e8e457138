use axum::{
    Router,
    extract::{Json, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use std::net::SocketAddr;
use tokio::net::TcpListener;

use crate::core::{
    DEFAULT_DISCOUNT_RATE, DEFAULT_EFFICIENCY_DRIFT, DEFAULT_INFLATION_RATE,
    DEFAULT_LIFETIME_YEARS, MAX_LIFETIME_YEARS, PAYBACK_NOT_ACHIEVED, RoiError, RoiInputs,
    run_flat, run_projection,
};

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");
const APIDOCS_HTML: &str = include_str!("../../web/apidocs.html");

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn build_router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route("/apidocs", get(apidocs_handler))
        .route("/apispec.json", get(apispec_handler))
        .route("/roi", post(projection_handler))
        .route("/roi/flat", post(flat_handler))
        .fallback(not_found_handler)
}

pub async fn run_http_server(addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    log::info!("Solar ROI HTTP API listening on http://{addr}");
    log::info!("API docs: http://127.0.0.1:{}/apidocs", addr.port());

    axum::serve(listener, build_router()).await
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn apidocs_handler() -> impl IntoResponse {
    with_cache_control(Html(APIDOCS_HTML))
}

async fn apispec_handler() -> Response {
    json_response(StatusCode::OK, api_spec())
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn projection_handler(payload: Result<Json<Value>, JsonRejection>) -> Response {
    calculation_response("projection", payload, run_projection)
}

async fn flat_handler(payload: Result<Json<Value>, JsonRejection>) -> Response {
    calculation_response("flat", payload, run_flat)
}

fn calculation_response<T, F>(
    label: &str,
    payload: Result<Json<Value>, JsonRejection>,
    calculate: F,
) -> Response
where
    T: Serialize,
    F: FnOnce(&RoiInputs) -> Result<T, RoiError>,
{
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            log::warn!("{label} request rejected: {rejection}");
            return error_response(
                StatusCode::BAD_REQUEST,
                &format!("Invalid JSON payload: {}", rejection.body_text()),
            );
        }
    };

    let outcome = inputs_from_json(&body).and_then(|inputs| {
        log::debug!("{label} request: {inputs:?}");
        calculate(&inputs)
    });

    match outcome {
        Ok(result) => json_response(StatusCode::OK, result),
        Err(err) if err.is_validation() => {
            log::warn!("{label} request failed validation: {err}");
            error_response(StatusCode::BAD_REQUEST, &err.to_string())
        }
        Err(err) => {
            log::error!("{label} calculation failed: {err}");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string())
        }
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

/// Reads a loosely typed request body into `RoiInputs`. Absent required
/// fields are validation errors; present values that cannot be read as
/// numbers are computation errors carrying the coercion message.
fn inputs_from_json(body: &Value) -> Result<RoiInputs, RoiError> {
    let Some(fields) = body.as_object() else {
        return Err(RoiError::invalid("body", "must be a JSON object"));
    };
    let payload = PayloadFields(fields);

    Ok(RoiInputs {
        capex: payload.required_number("capex")?,
        opex: payload.required_number("opex")?,
        generation: payload.required_number("generation")?,
        tariff: payload.required_number("tariff")?,
        lifetime: payload.lifetime()?,
        inflation_rate: payload.optional_number("inflation_rate", DEFAULT_INFLATION_RATE)?,
        discount_rate: payload.optional_number("discount_rate", DEFAULT_DISCOUNT_RATE)?,
        efficiency_drift: payload.optional_number("efficiency_drift", DEFAULT_EFFICIENCY_DRIFT)?,
        one_time_incentive: payload.optional_number("one_time_incentive", 0.0)?,
        feed_in_tariff_bonus: payload.optional_number("feed_in_tariff_bonus", 0.0)?,
    })
}

struct PayloadFields<'a>(&'a Map<String, Value>);

impl PayloadFields<'_> {
    fn required_number(&self, field: &'static str) -> Result<f64, RoiError> {
        match self.0.get(field) {
            Some(value) => coerce_number(field, value),
            None => Err(RoiError::MissingField(field)),
        }
    }

    fn optional_number(&self, field: &'static str, default: f64) -> Result<f64, RoiError> {
        self.0
            .get(field)
            .map_or(Ok(default), |value| coerce_number(field, value))
    }

    fn lifetime(&self) -> Result<u32, RoiError> {
        let Some(value) = self.0.get("lifetime") else {
            return Ok(DEFAULT_LIFETIME_YEARS);
        };

        let years = match value {
            Value::Number(n) => match n.as_i64() {
                Some(v) => v,
                None => n
                    .as_f64()
                    .filter(|v| v.is_finite())
                    .map(|v| v.trunc() as i64)
                    .ok_or_else(|| coercion_error("lifetime", "an integer", value))?,
            },
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| coercion_error("lifetime", "an integer", value))?,
            _ => return Err(coercion_error("lifetime", "an integer", value)),
        };

        if years <= 0 {
            return Err(RoiError::invalid("lifetime", "must be > 0"));
        }
        u32::try_from(years)
            .map_err(|_| RoiError::invalid("lifetime", format!("must be <= {MAX_LIFETIME_YEARS}")))
    }
}

fn coerce_number(field: &str, value: &Value) -> Result<f64, RoiError> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| coercion_error(field, "a number", value))
}

fn coercion_error(field: &str, target: &str, value: &Value) -> RoiError {
    RoiError::Computation(format!("could not convert {field} to {target}: {value}"))
}

fn input_properties(include_projection_fields: bool) -> Value {
    let mut properties = json!({
        "capex": { "type": "number", "example": 200000, "description": "Capital expenditure" },
        "opex": { "type": "number", "example": 5000, "description": "Operating expenses per year" },
        "generation": { "type": "number", "example": 8000, "description": "Energy generation in year one" },
        "tariff": { "type": "number", "example": 6.0, "description": "Tariff per energy unit" },
        "lifetime": {
            "type": "integer",
            "example": 20,
            "default": DEFAULT_LIFETIME_YEARS,
            "description": "Lifetime of the plant in years"
        }
    });
    if include_projection_fields {
        if let Some(map) = properties.as_object_mut() {
            for (name, default, description) in [
                ("inflation_rate", DEFAULT_INFLATION_RATE, "Annual utility price inflation"),
                ("discount_rate", DEFAULT_DISCOUNT_RATE, "Discount rate for present value"),
                ("efficiency_drift", DEFAULT_EFFICIENCY_DRIFT, "Annual panel output decline"),
                ("one_time_incentive", 0.0, "Up-front subsidy netted against capex"),
                ("feed_in_tariff_bonus", 0.0, "Extra revenue per exported energy unit"),
            ] {
                map.insert(
                    name.to_string(),
                    json!({ "type": "number", "default": default, "description": description }),
                );
            }
        }
    }
    json!({
        "type": "object",
        "required": ["capex", "opex", "generation", "tariff"],
        "properties": properties
    })
}

fn api_spec() -> Value {
    let error_schema = json!({
        "type": "object",
        "properties": { "error": { "type": "string" } }
    });
    json!({
        "swagger": "2.0",
        "info": {
            "title": "Solar ROI API",
            "version": env!("CARGO_PKG_VERSION"),
            "description": "Return on investment and payback period for a solar plant"
        },
        "consumes": ["application/json"],
        "produces": ["application/json"],
        "paths": {
            "/roi": {
                "post": {
                    "summary": "Year-by-year ROI projection with degradation, inflation and incentives",
                    "parameters": [{
                        "in": "body",
                        "name": "body",
                        "required": true,
                        "schema": input_properties(true)
                    }],
                    "responses": {
                        "200": {
                            "description": "Projection calculated successfully",
                            "schema": {
                                "type": "object",
                                "properties": {
                                    "annual_savings": { "type": "array", "items": { "type": "number" } },
                                    "utility_costs": { "type": "array", "items": { "type": "number" } },
                                    "cumulative_savings": { "type": "array", "items": { "type": "number" } },
                                    "payback_period_years": {
                                        "description": format!("Year of payback, or \"{PAYBACK_NOT_ACHIEVED}\"")
                                    },
                                    "roi_percent": { "type": "number" },
                                    "total_profit": { "type": "number" },
                                    "present_value_profit": { "type": "number" }
                                }
                            }
                        },
                        "400": { "description": "Invalid or missing input", "schema": error_schema },
                        "500": { "description": "Calculation failed", "schema": error_schema }
                    }
                }
            },
            "/roi/flat": {
                "post": {
                    "summary": "Single-rate ROI and fractional payback period",
                    "parameters": [{
                        "in": "body",
                        "name": "body",
                        "required": true,
                        "schema": input_properties(false)
                    }],
                    "responses": {
                        "200": {
                            "description": "ROI and payback period calculated successfully",
                            "examples": {
                                "application/json": {
                                    "annual_profit": 43000.0,
                                    "payback_period_years": 4.65,
                                    "roi_percent": 330.0,
                                    "total_profit": 660000.0
                                }
                            }
                        },
                        "400": { "description": "Invalid input or non-positive annual profit", "schema": error_schema },
                        "500": { "description": "Calculation failed", "schema": error_schema }
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::FromRequest, http::Request};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn sample_body() -> Value {
        json!({
            "capex": 200000,
            "opex": 5000,
            "generation": 8000,
            "tariff": 6.0
        })
    }

    async fn read_json(response: Response) -> (StatusCode, Value) {
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let body = serde_json::from_slice(&bytes).expect("body should be JSON");
        (status, body)
    }

    fn number(body: &Value, key: &str) -> f64 {
        body[key]
            .as_f64()
            .unwrap_or_else(|| panic!("{key} should be a number in {body}"))
    }

    #[test]
    fn inputs_from_json_applies_defaults() {
        let inputs = inputs_from_json(&sample_body()).expect("valid body");
        assert_eq!(inputs, RoiInputs::with_defaults(200_000.0, 5_000.0, 8_000.0, 6.0));
    }

    #[test]
    fn inputs_from_json_accepts_numeric_strings() {
        let body = json!({
            "capex": "200000",
            "opex": " 5000.5 ",
            "generation": 8000,
            "tariff": "6",
            "lifetime": "30",
            "discount_rate": "0.05"
        });
        let inputs = inputs_from_json(&body).expect("numeric strings coerce");
        assert_approx(inputs.capex, 200_000.0);
        assert_approx(inputs.opex, 5_000.5);
        assert_approx(inputs.tariff, 6.0);
        assert_eq!(inputs.lifetime, 30);
        assert_approx(inputs.discount_rate, 0.05);
    }

    #[test]
    fn inputs_from_json_truncates_fractional_lifetime() {
        let mut body = sample_body();
        body["lifetime"] = json!(12.9);
        let inputs = inputs_from_json(&body).expect("float lifetime truncates");
        assert_eq!(inputs.lifetime, 12);
    }

    #[test]
    fn inputs_from_json_reports_first_missing_field() {
        let body = json!({ "capex": 1.0, "generation": 2.0 });
        assert_eq!(inputs_from_json(&body), Err(RoiError::MissingField("opex")));
    }

    #[test]
    fn inputs_from_json_treats_null_as_unconvertible() {
        let mut body = sample_body();
        body["capex"] = Value::Null;
        let err = inputs_from_json(&body).expect_err("null is not a number");
        assert!(!err.is_validation());
        assert!(err.to_string().contains("capex"));
    }

    #[test]
    fn inputs_from_json_rejects_non_positive_lifetime() {
        let mut body = sample_body();
        body["lifetime"] = json!(-3);
        let err = inputs_from_json(&body).expect_err("negative lifetime");
        assert!(err.is_validation());
        assert!(err.to_string().contains("lifetime"));
    }

    #[tokio::test]
    async fn flat_endpoint_matches_reference_scenario() {
        let mut body = sample_body();
        body["lifetime"] = json!(20);

        let (status, body) = read_json(flat_handler(Ok(Json(body))).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_approx(number(&body, "annual_profit"), 43_000.0);
        assert_approx(number(&body, "payback_period_years"), 4.65);
        assert_approx(number(&body, "roi_percent"), 330.0);
        assert_approx(number(&body, "total_profit"), 660_000.0);
    }

    #[tokio::test]
    async fn flat_endpoint_rejects_unprofitable_plant() {
        let mut body = sample_body();
        body["opex"] = json!(48000);

        let (status, body) = read_json(flat_handler(Ok(Json(body))).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body["error"],
            "Annual profit is zero or negative. Please check your inputs."
        );
    }

    #[tokio::test]
    async fn projection_endpoint_returns_full_series() {
        let (status, body) = read_json(projection_handler(Ok(Json(sample_body()))).await).await;
        assert_eq!(status, StatusCode::OK);

        for key in ["annual_savings", "utility_costs", "cumulative_savings"] {
            let series = body[key].as_array().expect("series should be an array");
            assert_eq!(series.len(), 25, "{key} length");
        }
        assert_approx(body["annual_savings"][0].as_f64().expect("number"), 43_000.0);
        assert_eq!(body["payback_period_years"], json!(5));
        assert_eq!(body["lifetime"], json!(25));
        assert_approx(number(&body, "efficiency_drift"), 0.005);
        assert!(body.get("present_value_profit").is_some());
    }

    #[tokio::test]
    async fn projection_endpoint_marks_payback_not_achieved() {
        let mut body = sample_body();
        body["capex"] = json!(50_000_000);
        body["lifetime"] = json!(3);

        let (status, body) = read_json(projection_handler(Ok(Json(body))).await).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["payback_period_years"], json!(PAYBACK_NOT_ACHIEVED));
    }

    #[tokio::test]
    async fn projection_endpoint_names_missing_field() {
        let mut body = sample_body();
        body.as_object_mut().expect("object").remove("tariff");

        let (status, body) = read_json(projection_handler(Ok(Json(body))).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing field: 'tariff'");
    }

    #[tokio::test]
    async fn projection_endpoint_rejects_zero_capex() {
        let mut body = sample_body();
        body["capex"] = json!(0);

        let (status, body) = read_json(projection_handler(Ok(Json(body))).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("message").contains("capex"));
    }

    #[tokio::test]
    async fn non_numeric_field_is_a_server_error() {
        let mut body = sample_body();
        body["generation"] = json!("lots");

        let (status, body) = read_json(projection_handler(Ok(Json(body))).await).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body["error"],
            "could not convert generation to a number: \"lots\""
        );
    }

    async fn extract_json(
        content_type: Option<&str>,
        raw: &'static str,
    ) -> Result<Json<Value>, JsonRejection> {
        let mut request = Request::builder().method("POST").uri("/roi");
        if let Some(content_type) = content_type {
            request = request.header(header::CONTENT_TYPE, content_type);
        }
        let request = request.body(Body::from(raw)).expect("request should build");
        Json::<Value>::from_request(request, &()).await
    }

    #[tokio::test]
    async fn malformed_json_body_is_a_bad_request() {
        let payload = extract_json(Some("application/json"), "{\"capex\": 200000,").await;
        assert!(payload.is_err());

        let (status, body) = read_json(projection_handler(payload).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .expect("message")
                .starts_with("Invalid JSON payload")
        );
    }

    #[tokio::test]
    async fn missing_content_type_is_a_bad_request() {
        let payload = extract_json(None, "{\"capex\": 200000}").await;
        assert!(payload.is_err());

        let (status, body) = read_json(flat_handler(payload).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn non_object_body_is_rejected() {
        let (status, body) = read_json(flat_handler(Ok(Json(json!([1, 2, 3])))).await).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().expect("message").contains("JSON object"));
    }

    #[tokio::test]
    async fn unknown_route_returns_json_not_found() {
        let (status, body) = read_json(not_found_handler().await).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not found");
    }

    #[tokio::test]
    async fn responses_are_not_cached() {
        let response = flat_handler(Ok(Json(sample_body()))).await;
        assert_eq!(
            response.headers().get(header::CACHE_CONTROL),
            Some(&header::HeaderValue::from_static("no-store"))
        );
    }

    #[test]
    fn api_spec_documents_both_calculations() {
        let spec = api_spec();
        assert_eq!(spec["swagger"], "2.0");
        let required = &spec["paths"]["/roi"]["post"]["parameters"][0]["schema"]["required"];
        assert_eq!(required, &json!(["capex", "opex", "generation", "tariff"]));
        assert!(
            spec["paths"]["/roi"]["post"]["parameters"][0]["schema"]["properties"]
                .get("feed_in_tariff_bonus")
                .is_some()
        );
        assert!(
            spec["paths"]["/roi/flat"]["post"]["parameters"][0]["schema"]["properties"]
                .get("discount_rate")
                .is_none()
        );
    }
}
