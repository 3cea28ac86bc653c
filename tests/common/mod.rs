use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

#[derive(Debug, Clone, Copy)]
enum CounterOp {
    Increment,
    Decrement,
    Zero,
}

/// 有状态的计数器响应器, 对应被测的计数服务语义
struct CounterResponder {
    count: Arc<AtomicI64>,
    op: CounterOp,
}

impl Respond for CounterResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let count = match self.op {
            CounterOp::Increment => self.count.fetch_add(1, Ordering::SeqCst) + 1,
            CounterOp::Decrement => self.count.fetch_sub(1, Ordering::SeqCst) - 1,
            CounterOp::Zero => {
                self.count.store(0, Ordering::SeqCst);
                0
            }
        };
        ResponseTemplate::new(200).set_body_json(serde_json::json!({ "count": count }))
    }
}

/// 挂载 POST /increment, /decrement, /zero 三个计数端点
#[allow(dead_code)]
pub async fn mount_counter(server: &MockServer) -> Arc<AtomicI64> {
    let count = Arc::new(AtomicI64::new(0));
    let routes = [
        ("/increment", CounterOp::Increment),
        ("/decrement", CounterOp::Decrement),
        ("/zero", CounterOp::Zero),
    ];
    for (route, op) in routes {
        Mock::given(method("POST"))
            .and(path(route))
            .respond_with(CounterResponder {
                count: Arc::clone(&count),
                op,
            })
            .mount(server)
            .await;
    }
    count
}
