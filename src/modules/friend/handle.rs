use actix_web::{get, patch, post, web, Either, HttpRequest};

use crate::{
    api::{error, success},
    middlewares::get_extensions,
    modules::{
        friend::{
            model::{FriendRequestBody, FriendRequestResponse, FriendResponse, SendRequestOutcome},
            repository_pg::FriendRepositoryPg,
            schema::FriendRequestEntity,
            service::FriendService,
        },
        user::repository_pg::UserRepositoryPg,
    },
    utils::{Claims, PageQuery, ValidatedJson, ValidatedQuery},
};

pub type FriendSvc = FriendService<FriendRepositoryPg, UserRepositoryPg>;

type SendResponse = Either<success::Success<FriendRequestEntity>, success::Success<FriendResponse>>;

#[post("/requests")]
pub async fn send_friend_request(
    friend_service: web::Data<FriendSvc>,
    body: ValidatedJson<FriendRequestBody>,
    req: HttpRequest,
) -> Result<SendResponse, error::Error> {
    let requester_id = get_extensions::<Claims>(&req)?.sub;
    let outcome = friend_service.send_request(requester_id, &body.0.username).await?;

    Ok(match outcome {
        SendRequestOutcome::Requested(request) => Either::Left(
            success::Success::created(Some(request)).message("Friend request sent successfully"),
        ),
        SendRequestOutcome::AutoAccepted(friend) => Either::Right(
            success::Success::ok(Some(friend)).message("Friend request accepted automatically"),
        ),
    })
}

#[patch("/requests")]
pub async fn accept_friend_request(
    friend_service: web::Data<FriendSvc>,
    body: ValidatedJson<FriendRequestBody>,
    req: HttpRequest,
) -> Result<success::Success<FriendResponse>, error::Error> {
    let accepter_id = get_extensions::<Claims>(&req)?.sub;
    let friend = friend_service.accept_request(accepter_id, &body.0.username).await?;

    Ok(success::Success::ok(Some(friend)).message("Friend request accepted successfully"))
}

#[get("")]
pub async fn list_friends(
    friend_service: web::Data<FriendSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<FriendResponse>>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let friends = friend_service.list_friends(user_id).await?;

    Ok(success::Success::ok(Some(friends)).message("Friends retrieved successfully"))
}

#[get("/requests/sent")]
pub async fn list_sent_requests(
    friend_service: web::Data<FriendSvc>,
    query: ValidatedQuery<PageQuery>,
    req: HttpRequest,
) -> Result<success::Success<Vec<FriendRequestResponse>>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let requests = friend_service.list_sent_requests(user_id, query.0.pagination()).await?;

    Ok(success::Success::ok(Some(requests)).message("Friend requests retrieved successfully"))
}

#[get("/requests/received")]
pub async fn list_received_requests(
    friend_service: web::Data<FriendSvc>,
    req: HttpRequest,
) -> Result<success::Success<Vec<FriendRequestResponse>>, error::Error> {
    let user_id = get_extensions::<Claims>(&req)?.sub;
    let requests = friend_service.list_received_requests(user_id).await?;

    Ok(success::Success::ok(Some(requests)).message("Friend requests retrieved successfully"))
}
