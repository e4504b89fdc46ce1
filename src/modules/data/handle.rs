use actix_multipart::Multipart;
use actix_web::{get, post, web, HttpRequest, HttpResponse};
use futures_util::TryStreamExt;
use uuid::Uuid;

use crate::{
    api::{error, success},
    middlewares::get_extensions,
    modules::data::{
        model::{AddDataQuery, DataListItem, DataResponse},
        repository_pg::DataRepositoryPg,
        service::DataService,
    },
    utils::{Claims, PageQuery, ValidatedQuery},
};

pub type DataSvc = DataService<DataRepositoryPg>;

/// Collects the `data` form field, refusing to buffer past `limit`.
async fn read_data_field(payload: &mut Multipart, limit: usize) -> Result<Vec<u8>, error::Error> {
    while let Some(mut field) =
        payload.try_next().await.map_err(|e| error::Error::bad_request(e.to_string()))?
    {
        if field.name() != Some("data") {
            continue;
        }

        let mut bytes = Vec::new();
        while let Some(chunk) =
            field.try_next().await.map_err(|e| error::Error::bad_request(e.to_string()))?
        {
            if bytes.len() + chunk.len() > limit {
                return Err(error::Error::PayloadTooLarge(
                    format!("Data exceeds maximum allowed size of {limit} bytes").into(),
                ));
            }
            bytes.extend_from_slice(&chunk);
        }
        return Ok(bytes);
    }

    Err(error::Error::bad_request("Missing data field"))
}

#[post("")]
pub async fn add_data(
    data_service: web::Data<DataSvc>,
    query: ValidatedQuery<AddDataQuery>,
    mut payload: Multipart,
    req: HttpRequest,
) -> Result<success::Success<DataResponse>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let bytes = read_data_field(&mut payload, data_service.max_bytes()).await?;

    let added = data_service.add(user_id, bytes, query.0.public.unwrap_or(false)).await?;
    Ok(success::Success::created(Some(added)).message("Data uploaded successfully"))
}

#[get("")]
pub async fn list_data(
    data_service: web::Data<DataSvc>,
    query: ValidatedQuery<PageQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<DataListItem>>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let items = data_service.list(user_id, query.0.pagination()).await?;
    Ok(success::Success::ok(Some(items)).message("Data retrieved successfully"))
}

#[get("/{id}")]
pub async fn retrieve_data(
    data_service: web::Data<DataSvc>,
    id: web::Path<Uuid>,
    req: HttpRequest,
) -> Result<HttpResponse, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let entity = data_service.retrieve(user_id, id.into_inner()).await?;

    Ok(HttpResponse::Ok().content_type("application/octet-stream").body(entity.data))
}
