use axum::extract::State;
use serde::Deserialize;

use service::shipping::{City, Warehouse};

use crate::{extract::QueryParams, routes::{ok, ApiResult}, state::ServerState};

#[derive(Debug, Deserialize)]
pub struct CityQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct WarehouseQuery {
    #[serde(default)]
    pub city_ref: String,
}

#[utoipa::path(get, path = "/shipping/cities", tag = "shipping", params(crate::openapi::CityParams), responses((status = 200, description = "Matching settlements"), (status = 400, description = "Empty query"), (status = 502, description = "Nova Poshta unavailable")))]
pub async fn cities(State(state): State<ServerState>, QueryParams(q): QueryParams<CityQuery>) -> ApiResult<Vec<City>> {
    ok(state.shipping.cities(&q.q).await?)
}

#[utoipa::path(get, path = "/shipping/warehouses", tag = "shipping", params(crate::openapi::WarehouseParams), responses((status = 200, description = "Branches of the city"), (status = 400, description = "Missing city_ref")))]
pub async fn warehouses(State(state): State<ServerState>, QueryParams(q): QueryParams<WarehouseQuery>) -> ApiResult<Vec<Warehouse>> {
    ok(state.shipping.warehouses(&q.city_ref).await?)
}
