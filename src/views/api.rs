use std::str::FromStr;

use rocket::{get, http::Status, routes, serde::json::Json, Route, State};

use crate::{
    effectiveness::EffectivenessResult,
    error::{ApiError, ApiResult, Error, WithStatus},
    resolver::{CreatureRecord, Resolver},
    types::ElementalType,
};

fn parse_type(name: &str) -> ApiResult<ElementalType> {
    ElementalType::from_str(name)
        .map_err(Error::from)
        .status(Status::NotFound)
}

#[get("/creature/<name_or_id>")]
#[tracing::instrument(skip(resolver))]
pub(crate) async fn get_creature(
    name_or_id: &str,
    resolver: &State<Resolver>,
) -> ApiResult<Json<CreatureRecord>> {
    Ok(Json(resolver.resolve(name_or_id).await?))
}

#[get("/matchup/<primary>")]
#[tracing::instrument(skip(resolver))]
pub(crate) async fn get_single_matchup(
    primary: &str,
    resolver: &State<Resolver>,
) -> ApiResult<Json<EffectivenessResult>> {
    let types = [parse_type(primary)?];
    Ok(Json(resolver.matchup(&types).await?))
}

#[get("/matchup/<primary>/<secondary>")]
#[tracing::instrument(skip(resolver))]
pub(crate) async fn get_dual_matchup(
    primary: &str,
    secondary: &str,
    resolver: &State<Resolver>,
) -> ApiResult<Json<EffectivenessResult>> {
    let types = [parse_type(primary)?, parse_type(secondary)?];
    if types[0] == types[1] {
        return Err(ApiError {
            error: anyhow::anyhow!("{} is listed twice", types[0]),
            status: Status::UnprocessableEntity,
        });
    }

    Ok(Json(resolver.matchup(&types).await?))
}

pub fn routes() -> Vec<Route> {
    routes![get_creature, get_single_matchup, get_dual_matchup]
}
