//! End-to-end runs of the prompt pipeline against scripted transports.
//!
//! Each test builds a small project on disk, assembles a prompt from it the
//! way the interactive driver does, and runs it through a [`Gateway`] whose
//! transport is a stand-in.  Nothing here touches the network except
//! `live_round_trip`, which is `#[ignore]`d:
//!
//! ```sh
//! OPENAI_API_KEY=sk-... \
//!   cargo test --test pipeline -- --include-ignored --nocapture
//! ```

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

use rstest::{fixture, rstest};
use tempfile::TempDir;
use treeprompt::cost::{CostEstimator, HeuristicTokenizer, PriceTable};
use treeprompt::gateway::{
    ChatRequest, ChatTransport, CompletionParams, Gateway, GatewayError, OpenAiTransport,
    TransportConfig, TransportError,
};
use treeprompt::message::{Message, Role};
use treeprompt::pipeline;
use treeprompt::prompt::{AssistanceType, assemble, format_project_files};
use treeprompt::tree::render_tree;
use treeprompt::walk::{WalkOptions, collect_dir};

// ── transports ────────────────────────────────────────────────────────────────

/// Returns a fixed reply and keeps a copy of every request.
#[derive(Clone, Default)]
struct Recording {
    requests: Rc<RefCell<Vec<Vec<Message>>>>,
    reply: &'static str,
}

impl ChatTransport for Recording {
    fn send(&self, request: &ChatRequest<'_>) -> Result<String, TransportError> {
        self.requests.borrow_mut().push(request.messages.to_vec());
        Ok(self.reply.to_string())
    }
}

struct ServerError;

impl ChatTransport for ServerError {
    fn send(&self, _: &ChatRequest<'_>) -> Result<String, TransportError> {
        Err(TransportError::Api {
            status: 500,
            body: "internal error".into(),
        })
    }
}

// ── fixtures ──────────────────────────────────────────────────────────────────

fn params() -> CompletionParams {
    CompletionParams {
        model: "gpt-4o".into(),
        temperature: 0.2,
        max_tokens: 1024,
    }
}

fn estimator() -> CostEstimator {
    CostEstimator::new("gpt-4o", &PriceTable::builtin(), Box::new(HeuristicTokenizer)).unwrap()
}

#[fixture]
fn project() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("src")).unwrap();
    std::fs::create_dir_all(root.join(".git/objects")).unwrap();
    std::fs::write(root.join(".git/HEAD"), "ref: refs/heads/main\n").unwrap();
    std::fs::write(
        root.join("src/App.java"),
        "class App {\n    public static void main(String[] a) { Object o = null; o.hashCode(); }\n}\n",
    )
    .unwrap();
    std::fs::write(root.join("README.md"), "# demo\n").unwrap();
    dir
}

fn debugging_prompt(root: &Path) -> (String, String) {
    let files = collect_dir(root, &WalkOptions::default()).unwrap();
    let tree = render_tree(root).unwrap().join("\n");
    let params = BTreeMap::from([("error", "NullPointerException at line 42")]);
    let prompt = assemble(
        "Web Developer",
        &tree,
        &format_project_files(&files.records),
        AssistanceType::Debugging,
        &params,
    )
    .unwrap();
    (prompt.system, prompt.user)
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[rstest]
fn debugging_request_carries_project_and_error(project: TempDir) {
    let out = tempfile::tempdir().unwrap();
    let transport = Recording {
        reply: "  Check `o` before calling hashCode.\n",
        ..Recording::default()
    };
    let requests = Rc::clone(&transport.requests);
    let gateway = Gateway::live(params(), Box::new(transport));

    let (system, user) = debugging_prompt(project.path());
    let report = pipeline::run(&system, &user, &gateway, &estimator(), out.path()).unwrap();

    let requests = requests.borrow();
    assert_eq!(requests.len(), 1);
    let [sys, usr] = requests[0].as_slice() else {
        panic!("expected two messages, got {}", requests[0].len());
    };
    assert_eq!(sys.role, Role::System);
    assert!(sys.content.contains("Role: You are a professional Web Developer."));
    assert!(sys.content.contains("App.java"));
    assert!(sys.content.contains("o.hashCode()"));
    assert!(!sys.content.contains("refs/heads/main"));
    assert_eq!(usr.role, Role::User);
    assert!(usr.content.starts_with("Error:\nNullPointerException at line 42"));

    // Transports hand back the reply as-is; the gateway does not re-trim.
    assert_eq!(report.response, "  Check `o` before calling hashCode.\n");
    assert_eq!(
        std::fs::read_to_string(&report.response_path).unwrap(),
        report.response
    );
    assert!(report.input.tokens > 0);
    assert_eq!(report.input.tokens, report.hypothetical_output.tokens);
    assert!((report.total_usd() - (report.input.usd + report.output.usd)).abs() < 1e-12);
}

#[rstest]
fn prepared_estimate_is_available_before_sending(project: TempDir) {
    let out = tempfile::tempdir().unwrap();
    let transport = Recording {
        reply: "ok",
        ..Recording::default()
    };
    let requests = Rc::clone(&transport.requests);
    let gateway = Gateway::live(params(), Box::new(transport));

    let (system, user) = debugging_prompt(project.path());
    let prepared = pipeline::prepare(&system, &user, &estimator());
    let estimate = prepared.estimate;
    assert!(estimate.input.tokens > 0);
    assert!(requests.borrow().is_empty());

    let report = pipeline::execute(prepared, &gateway, &estimator(), out.path()).unwrap();
    assert_eq!(requests.borrow().len(), 1);
    assert_eq!(report.input, estimate.input);
    assert_eq!(report.hypothetical_output, estimate.hypothetical_output);
}

#[rstest]
fn dry_run_saves_the_canned_response(project: TempDir) {
    let out = tempfile::tempdir().unwrap();
    let gateway = Gateway::dry_run(params(), "canned");

    let (system, user) = debugging_prompt(project.path());
    let report = pipeline::run(&system, &user, &gateway, &estimator(), out.path()).unwrap();

    assert_eq!(report.response, "canned");
    assert!(report.response_path.starts_with(out.path()));
}

#[rstest]
fn remote_failure_is_api_communication(project: TempDir) {
    let out = tempfile::tempdir().unwrap();
    let gateway = Gateway::live(params(), Box::new(ServerError));

    let (system, user) = debugging_prompt(project.path());
    let err = pipeline::run(&system, &user, &gateway, &estimator(), out.path()).unwrap_err();

    assert!(matches!(
        err,
        GatewayError::ApiCommunication(TransportError::Api { status: 500, .. })
    ));
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[rstest]
fn unwritable_output_is_persistence_not_api(project: TempDir) {
    let scratch = tempfile::tempdir().unwrap();
    let out = scratch.path().join("occupied");
    std::fs::write(&out, "a file where the output directory should be").unwrap();

    let transport = Recording {
        reply: "fine",
        ..Recording::default()
    };
    let gateway = Gateway::live(params(), Box::new(transport));

    let (system, user) = debugging_prompt(project.path());
    let err = pipeline::run(&system, &user, &gateway, &estimator(), &out).unwrap_err();

    assert!(matches!(err, GatewayError::Persistence(_)));
}

#[test]
#[ignore = "needs OPENAI_API_KEY and network access"]
fn live_round_trip() {
    let Ok(api_key) = std::env::var("OPENAI_API_KEY") else {
        eprintln!("OPENAI_API_KEY not set, skipping");
        return;
    };
    let transport = OpenAiTransport::new(TransportConfig {
        base_url: "https://api.openai.com/v1".into(),
        api_key,
        project_id: std::env::var("OPENAI_PROJECT_ID").ok(),
        organization: None,
        request_timeout: Duration::from_secs(60),
        connect_timeout: Duration::from_secs(10),
    })
    .unwrap();
    let gateway = Gateway::live(
        CompletionParams {
            model: "gpt-4o-mini".into(),
            temperature: 0.0,
            max_tokens: 16,
        },
        Box::new(transport),
    );
    let out = tempfile::tempdir().unwrap();
    let estimator =
        CostEstimator::new("gpt-4o-mini", &PriceTable::builtin(), Box::new(HeuristicTokenizer))
            .unwrap();

    let report = pipeline::run("Reply with one word.", "Say hi.", &gateway, &estimator, out.path())
        .unwrap();
    println!("response: {:?}, total {}", report.response, report.total_usd());
    assert!(!report.response.is_empty());
}
