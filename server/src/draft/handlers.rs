use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::Response,
    Json,
};
use uuid::Uuid;

use crate::{cards::CardClass, Resp};

use super::server::{DraftAction, DraftServer, DraftServerError, SessionView};

#[derive(serde::Deserialize)]
pub struct ClassRequest {
    class: CardClass,
}

#[derive(serde::Deserialize)]
pub struct PickRequest {
    pair: usize,
}

fn respond(result: Result<SessionView, DraftServerError>) -> Response<String> {
    match result {
        Ok(view) => Resp::session("ok", view),
        Err(e @ DraftServerError::NotFound(_)) => Resp::e404(e),
        Err(e @ DraftServerError::Rejected(_)) => Resp::e422(e),
        Err(e @ DraftServerError::Poisoned) => Resp::e500(e),
    }
}

pub async fn handle_create(State(server): State<Arc<DraftServer>>) -> Response<String> {
    respond(server.create())
}

pub async fn handle_view(
    State(server): State<Arc<DraftServer>>,
    Path(id): Path<Uuid>,
) -> Response<String> {
    respond(server.view(id))
}

pub async fn handle_class(
    State(server): State<Arc<DraftServer>>,
    Path(id): Path<Uuid>,
    Json(request): Json<ClassRequest>,
) -> Response<String> {
    respond(server.apply(id, DraftAction::ChooseClass(request.class)))
}

pub async fn handle_pick(
    State(server): State<Arc<DraftServer>>,
    Path(id): Path<Uuid>,
    Json(request): Json<PickRequest>,
) -> Response<String> {
    respond(server.apply(id, DraftAction::Pick(request.pair)))
}

pub async fn handle_reroll(
    State(server): State<Arc<DraftServer>>,
    Path(id): Path<Uuid>,
) -> Response<String> {
    respond(server.apply(id, DraftAction::Reroll))
}

pub async fn handle_restart(
    State(server): State<Arc<DraftServer>>,
    Path(id): Path<Uuid>,
) -> Response<String> {
    respond(server.apply(id, DraftAction::Restart))
}

pub async fn handle_delete(
    State(server): State<Arc<DraftServer>>,
    Path(id): Path<Uuid>,
) -> Response<String> {
    match server.remove(id) {
        Ok(()) => Resp::ok("Session removed."),
        Err(e) => respond(Err(e)),
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use axum::{
        extract::{Path, State},
        http::{Response, StatusCode},
        Json,
    };
    use uuid::Uuid;

    use crate::{cards::CardClass, draft::server::test::sample_server};

    use super::{
        handle_class, handle_create, handle_delete, handle_pick, handle_reroll, handle_restart,
        handle_view, ClassRequest, PickRequest,
    };

    fn body(resp: &Response<String>) -> serde_json::Value {
        serde_json::from_str(resp.body()).unwrap()
    }

    fn session_id(resp: &Response<String>) -> Uuid {
        body(resp)["session"]["id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap()
    }

    #[test]
    fn test_decode_requests() {
        let request: ClassRequest = serde_json::from_str(r#"{"class": "主教"}"#).unwrap();
        assert_eq!(request.class, CardClass::Havencraft);
        let request: ClassRequest = serde_json::from_str(r#"{"class": "Swordcraft"}"#).unwrap();
        assert_eq!(request.class, CardClass::Swordcraft);
        assert!(serde_json::from_str::<PickRequest>(r#"{"pair": -1}"#).is_err());
    }

    #[tokio::test]
    async fn test_draft_over_http() {
        let server = Arc::new(sample_server());

        let resp = handle_create(State(server.clone())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let created = body(&resp);
        assert_eq!(created["success"], true);
        assert_eq!(created["session"]["phase"], "class_selection");
        assert_eq!(created["session"]["previews"].as_array().unwrap().len(), 7);
        let id = session_id(&resp);

        let resp = handle_class(
            State(server.clone()),
            Path(id),
            Json(ClassRequest {
                class: CardClass::Runecraft,
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let view = body(&resp);
        assert_eq!(view["session"]["class"], "巫師");
        assert_eq!(view["session"]["round"], 1);
        let pairs = view["session"]["options"].as_array().unwrap();
        assert_eq!(pairs.len(), 2);
        assert!(pairs[0][0]["owned"].is_u64());
        assert_eq!(pairs[0][0]["rarity"], "銅");

        for _ in 0..3 {
            let resp = handle_reroll(State(server.clone()), Path(id)).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let before = body(&handle_view(State(server.clone()), Path(id)).await);
        assert_eq!(before["session"]["rerolls"], 0);

        let resp = handle_reroll(State(server.clone()), Path(id)).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body(&resp)["success"], false);
        let after = body(&handle_view(State(server.clone()), Path(id)).await);
        assert_eq!(before, after);

        for _ in 0..19 {
            let resp =
                handle_pick(State(server.clone()), Path(id), Json(PickRequest { pair: 0 })).await;
            assert_eq!(resp.status(), StatusCode::OK);
        }
        let finished = body(&handle_view(State(server.clone()), Path(id)).await);
        assert_eq!(finished["session"]["phase"], "finished");
        assert_eq!(finished["session"]["is_finished"], true);
        assert_eq!(finished["session"]["deck_size"], 40);

        let resp = handle_pick(State(server.clone()), Path(id), Json(PickRequest { pair: 0 })).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let resp = handle_restart(State(server.clone()), Path(id)).await;
        assert_eq!(body(&resp)["session"]["phase"], "class_selection");
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let server = Arc::new(sample_server());
        let missing = Uuid::new_v4();

        let resp = handle_view(State(server.clone()), Path(missing)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let resp = handle_reroll(State(server.clone()), Path(missing)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let id = session_id(&handle_create(State(server.clone())).await);
        let resp = handle_delete(State(server.clone()), Path(id)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let resp = handle_delete(State(server.clone()), Path(id)).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
