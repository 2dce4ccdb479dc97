use axum::extract::State;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;

use service::statistics_service::{self, DateRange, Grouping, SalesRow, Summary, TopProduct};

use crate::{errors::JsonApiError, extract::QueryParams, routes::{ok, ApiResult}, state::ServerState};

const DEFAULT_TOP_LIMIT: u32 = 10;

/// Calendar-day bounds; `to` is inclusive.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl RangeQuery {
    fn to_range(&self) -> Result<DateRange, JsonApiError> {
        let start = |d: NaiveDate| -> DateTime<Utc> { d.and_time(NaiveTime::MIN).and_utc() };
        let to = match self.to {
            Some(d) => Some(start(d.succ_opt().ok_or_else(|| JsonApiError::bad_request("`to` is out of range"))?)),
            None => None,
        };
        Ok(DateRange { from: self.from.map(start), to })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SalesQuery {
    #[serde(default)]
    pub grouping: Grouping,
}

#[derive(Debug, Default, Deserialize)]
pub struct TopQuery {
    pub limit: Option<u32>,
}

#[utoipa::path(get, path = "/admin/statistics/sales", tag = "statistics", params(crate::openapi::SalesParams), responses((status = 200, description = "Sales per period"), (status = 400, description = "Invalid range")))]
pub async fn sales(State(state): State<ServerState>, QueryParams(q): QueryParams<SalesQuery>, QueryParams(range): QueryParams<RangeQuery>) -> ApiResult<Vec<SalesRow>> {
    ok(statistics_service::sales(&state.db, q.grouping, range.to_range()?).await?)
}

#[utoipa::path(get, path = "/admin/statistics/top-products", tag = "statistics", params(crate::openapi::TopProductsParams), responses((status = 200, description = "Best sellers")))]
pub async fn top_products(State(state): State<ServerState>, QueryParams(q): QueryParams<TopQuery>, QueryParams(range): QueryParams<RangeQuery>) -> ApiResult<Vec<TopProduct>> {
    let limit = q.limit.unwrap_or(DEFAULT_TOP_LIMIT);
    ok(statistics_service::top_products(&state.db, limit, range.to_range()?).await?)
}

#[utoipa::path(get, path = "/admin/statistics/summary", tag = "statistics", responses((status = 200, description = "Store totals")))]
pub async fn summary(State(state): State<ServerState>) -> ApiResult<Summary> {
    ok(statistics_service::summary(&state.db).await?)
}
