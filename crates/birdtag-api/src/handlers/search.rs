//! Tag search: `?tag1=sparrow&count1=2&tag2=hawk` returns completed
//! records containing every requested tag with at least the requested
//! count (count defaults to 1).

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use birdtag_core::models::normalize_tag;
use birdtag_core::{MediaRecord, PipelineError};

use crate::error::{ErrorResponse, HttpError};
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchResponse {
    #[schema(value_type = Vec<Object>)]
    pub results: Vec<MediaRecord>,
    pub total: usize,
}

fn parse_requirements(params: &HashMap<String, String>) -> Result<Vec<(String, u32)>, PipelineError> {
    let mut requirements = Vec::new();
    let mut index = 1;

    while let Some(tag) = params.get(&format!("tag{}", index)) {
        let normalized = normalize_tag(tag);
        if normalized.is_empty() {
            return Err(PipelineError::Validation(format!("tag{} is empty", index)));
        }
        let count = match params.get(&format!("count{}", index)) {
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                PipelineError::Validation(format!("count{} is not a valid count: {}", index, raw))
            })?,
            None => 1,
        };
        requirements.push((normalized, count));
        index += 1;
    }

    if requirements.is_empty() {
        return Err(PipelineError::Validation(
            "at least one tag must be provided (tag1, tag2, ... with optional count1, count2, ...)"
                .to_string(),
        ));
    }

    Ok(requirements)
}

#[utoipa::path(
    get,
    path = "/api/v1/media/search",
    tag = "media",
    responses(
        (status = 200, description = "Matching media records", body = SearchResponse),
        (status = 400, description = "No tags provided", body = ErrorResponse)
    )
)]
pub async fn search_media(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, HttpError> {
    let requirements = parse_requirements(&params)?;

    let results = state.media.search_by_tags(&requirements).await?;
    let total = results.len();

    Ok(Json(SearchResponse { results, total }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parses_numbered_tags_with_default_count() {
        let requirements =
            parse_requirements(&params(&[("tag1", "Sparrow"), ("tag2", "hawk"), ("count2", "3")]))
                .unwrap();
        assert_eq!(
            requirements,
            vec![("sparrow".to_string(), 1), ("hawk".to_string(), 3)]
        );
    }

    #[test]
    fn no_tags_is_a_validation_error() {
        let err = parse_requirements(&params(&[("count1", "2")])).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn non_numeric_count_is_rejected() {
        let err =
            parse_requirements(&params(&[("tag1", "sparrow"), ("count1", "many")])).unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn numbering_stops_at_the_first_gap() {
        let requirements =
            parse_requirements(&params(&[("tag1", "sparrow"), ("tag3", "hawk")])).unwrap();
        assert_eq!(requirements, vec![("sparrow".to_string(), 1)]);
    }
}
