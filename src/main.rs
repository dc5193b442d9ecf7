use std::process::ExitCode;

use pidmap::{
    protocol::{ErrorKind, Request, Response},
    service::{PidClient, PidService},
    Pid, PidRange,
};
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;

struct Scenario {
    name: &'static str,
    client: PidClient,
    deviations: usize,
}

impl Scenario {
    fn send(&mut self, request: Request) -> Option<Response> {
        let line = request.to_string();

        match self.client.request_line(&line).and_then(|reply| reply.parse()) {
            Ok(response) => Some(response),
            Err(e) => {
                error!(scenario = self.name, %line, "request failed: {e}");
                self.deviations += 1;
                None
            }
        }
    }

    fn expect(&mut self, request: Request, want: Response) {
        if let Some(got) = self.send(request) {
            if got != want {
                error!(scenario = self.name, %request, %want, %got, "unexpected reply");
                self.deviations += 1;
            }
        }
    }

    fn allocate(&mut self) -> Option<Pid> {
        match self.send(Request::Allocate)? {
            Response::Allocated(pid) => Some(pid),
            _ => None,
        }
    }
}

fn run(name: &'static str, range: PidRange, body: impl FnOnce(&mut Scenario)) -> usize {
    let (service, client) = match PidService::spawn(range) {
        Ok(spawned) => spawned,
        Err(e) => {
            error!(scenario = name, "failed to start pid service: {e}");
            return 1;
        }
    };

    let mut scenario = Scenario {
        name,
        client,
        deviations: 0,
    };
    body(&mut scenario);
    scenario.expect(Request::Done, Response::Bye);

    match service.join() {
        Ok(served) => info!(scenario = name, served, deviations = scenario.deviations, "done"),
        Err(_) => {
            error!(scenario = name, "pid service panicked");
            scenario.deviations += 1;
        }
    }

    scenario.deviations
}

fn required(range: PidRange) -> impl FnOnce(&mut Scenario) {
    move |s: &mut Scenario| {
        s.expect(Request::Initialize, Response::Ok);

        for pid in range.min()..=range.max() {
            s.expect(Request::Allocate, Response::Allocated(Pid::new(pid)));
        }
        s.expect(
            Request::Allocate,
            Response::Error(ErrorKind::PoolExhausted),
        );

        for pid in range.min()..=range.max() {
            s.expect(Request::release(Pid::new(pid)), Response::Ok);
        }

        let reallocated = (range.min()..=range.max()).step_by(10).count() as u32;
        for offset in 0..reallocated {
            s.expect(
                Request::Allocate,
                Response::Allocated(Pid::new(range.min() + offset)),
            );
        }
    }
}

fn what_if(range: PidRange) -> impl FnOnce(&mut Scenario) {
    move |s: &mut Scenario| {
        s.expect(Request::Allocate, Response::Error(ErrorKind::NotInitialized));
        s.expect(
            Request::release(Pid::new(range.min())),
            Response::Error(ErrorKind::NotInitialized),
        );

        s.expect(Request::Initialize, Response::Ok);
        let first = s.allocate();
        if let Some(pid) = first {
            s.expect(Request::release(pid), Response::Ok);
            s.expect(Request::Allocate, Response::Allocated(pid));
        }

        s.expect(Request::Initialize, Response::Ok);
        let mut last = None;
        for _ in 0..range.capacity() {
            last = s.allocate();
        }
        info!(
            last = ?last.map(Pid::get),
            "filled the table"
        );
        s.expect(Request::Allocate, Response::Error(ErrorKind::PoolExhausted));

        // ids just outside the range, even when it touches 0 or u32::MAX
        s.expect(
            Request::Release(i64::from(range.max()) + 1),
            Response::Error(ErrorKind::OutOfRange),
        );
        s.expect(
            Request::Release(i64::from(range.min()) - 1),
            Response::Error(ErrorKind::OutOfRange),
        );
    }
}

fn churn(range: PidRange, rounds: usize) -> impl FnOnce(&mut Scenario) {
    move |s: &mut Scenario| {
        s.expect(Request::Initialize, Response::Ok);

        for _ in 0..rounds {
            for pid in range.min()..=range.max() {
                s.expect(Request::Allocate, Response::Allocated(Pid::new(range.min())));
                s.expect(Request::release(Pid::new(pid)), Response::Ok);
                // min is still held unless pid == min
                s.expect(Request::release(Pid::new(range.min())), Response::Ok);
            }
        }

        info!(
            operations = rounds * range.capacity(),
            "allocated and released pids"
        );
    }
}

fn main() -> ExitCode {
    let console_log = tracing_subscriber::fmt::Layer::new()
        .with_ansi(true)
        .with_writer(std::io::stdout);
    let subscriber = tracing_subscriber::registry().with(console_log);
    let _ = tracing::subscriber::set_global_default(subscriber);

    let range = match PidRange::from_env() {
        Ok(range) => range,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let deviations = run("required", range, required(range))
        + run("what-if", range, what_if(range))
        + run("churn", range, churn(range, 100));

    if deviations == 0 {
        info!("all scenarios passed");
        ExitCode::SUCCESS
    } else {
        error!(deviations, "scenarios deviated from expected behaviour");
        ExitCode::FAILURE
    }
}
