//! Local stand-in for the Bot API HTTP endpoint.

use std::{
    collections::BTreeSet,
    convert::Infallible,
    sync::{Arc, Mutex},
};

use hyper::{
    service::{make_service_fn, service_fn},
    Body, Request, Response, Server,
};
use serde_json::{json, Value};

pub const SCRATCH: i64 = -300;

/// Serves `forwardMessage` out of a fixed set of donor ids.
#[derive(Default)]
pub struct FakeBotApi {
    pub donor_ids: BTreeSet<i32>,
    /// When set, every `forwardMessage` fails with this description.
    pub fatal: Option<&'static str>,
    pub fail_deletes: bool,
    pub forwarded: Mutex<Vec<i32>>,
    pub deleted: Mutex<Vec<i32>>,
}

impl FakeBotApi {
    pub fn with_ids(ids: impl IntoIterator<Item = i32>) -> Self {
        Self {
            donor_ids: ids.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn forwarded(&self) -> Vec<i32> {
        self.forwarded.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<i32> {
        self.deleted.lock().unwrap().clone()
    }

    /// Bind to an ephemeral port and return the base url to hand to `Bot`.
    pub fn serve(self: Arc<Self>) -> reqwest::Url {
        let api = self;
        let make = make_service_fn(move |_| {
            let api = api.clone();
            async move {
                Ok::<_, Infallible>(service_fn(move |req| {
                    let api = api.clone();
                    async move { Ok::<_, Infallible>(api.handle(req).await) }
                }))
            }
        });

        let server = Server::bind(&([127, 0, 0, 1], 0).into()).serve(make);
        let addr = server.local_addr();
        tokio::spawn(server);
        reqwest::Url::parse(&format!("http://{addr}/")).unwrap()
    }

    async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let method = req.uri().path().rsplit('/').next().unwrap_or_default().to_ascii_lowercase();
        let bytes = hyper::body::to_bytes(req.into_body()).await.unwrap();
        let params: Value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        let reply = match method.as_str() {
            "forwardmessage" => self.forward(&params),
            "deletemessage" => self.delete(&params),
            other => failure(&format!("Not Found: method {other} not stubbed")),
        };
        Response::new(Body::from(reply.to_string()))
    }

    fn forward(&self, params: &Value) -> Value {
        let id = params["message_id"].as_i64().unwrap_or_default() as i32;
        self.forwarded.lock().unwrap().push(id);

        if let Some(description) = self.fatal {
            return failure(description);
        }
        if !self.donor_ids.contains(&id) {
            return failure("Bad Request: message to forward not found");
        }

        json!({
            "ok": true,
            "result": {
                "message_id": 1000 + id,
                "date": 1_700_000_000,
                "chat": { "id": SCRATCH, "first_name": "Scratch", "type": "private" },
                "text": format!("donor {id}"),
            }
        })
    }

    fn delete(&self, params: &Value) -> Value {
        let id = params["message_id"].as_i64().unwrap_or_default() as i32;
        self.deleted.lock().unwrap().push(id);
        if self.fail_deletes {
            return failure("Bad Request: message can't be deleted");
        }
        json!({ "ok": true, "result": true })
    }
}

fn failure(description: &str) -> Value {
    json!({ "ok": false, "error_code": 400, "description": description })
}
