// ABOUTME: Lifecycle reconciler: drives a machine to running, stopped, or destroyed.
// ABOUTME: Observes, re-observes before every mutation, then polls until convergence or deadline.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::Machine;
use super::error::{NotFoundSnafu, ReconcileError, TimeoutSnafu};
use super::observer::StateObserver;
use super::state::{CanonicalState, Goal, Mutation, Step, plan};
use crate::provider::{
    Exhausted, InstanceSpec, ProviderError, ProviderGateway, RetryPolicy, with_retry,
};
use crate::types::{InstanceId, MachineName};

/// Polling bounds for one reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ReconcileSettings {
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    pub poll_interval: Duration,

    /// Deadline for the whole operation, waits included.
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Upper bound on observations made while polling.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_max_polls() -> u32 {
    120
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        ReconcileSettings {
            poll_interval: default_poll_interval(),
            timeout: default_timeout(),
            max_polls: default_max_polls(),
        }
    }
}

/// Result of a reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct Outcome {
    /// The last observation, which satisfies the goal.
    pub machine: Machine,
    /// The mutation that was issued, or `None` for a noop.
    pub mutation: Option<Mutation>,
}

impl Outcome {
    pub fn is_noop(&self) -> bool {
        self.mutation.is_none()
    }
}

/// The desired end state, carrying what is needed to create the machine.
#[derive(Debug, Clone, Copy)]
enum Target<'s> {
    Running(&'s InstanceSpec),
    Stopped,
    Destroyed,
}

impl Target<'_> {
    fn goal(&self) -> Goal {
        match self {
            Target::Running(_) => Goal::Running,
            Target::Stopped => Goal::Stopped,
            Target::Destroyed => Goal::Destroyed,
        }
    }
}

/// A planned mutation bound to the template or instance it acts on.
#[derive(Debug, Clone, Copy)]
enum Action<'a> {
    Create(&'a InstanceSpec),
    Start(&'a InstanceId),
    Stop(&'a InstanceId),
    Terminate(&'a InstanceId),
}

impl<'a> Action<'a> {
    /// `None` when the machine has no live instance for a start, stop, or terminate.
    fn bind(mutation: Mutation, target: Target<'a>, machine: &'a Machine) -> Option<Self> {
        let live = machine
            .instance_id
            .as_ref()
            .filter(|_| !machine.state.is_gone());

        match (mutation, target, live) {
            (Mutation::Create, Target::Running(spec), _) => Some(Action::Create(spec)),
            (Mutation::Start, _, Some(id)) => Some(Action::Start(id)),
            (Mutation::Stop, _, Some(id)) => Some(Action::Stop(id)),
            (Mutation::Terminate, _, Some(id)) => Some(Action::Terminate(id)),
            _ => None,
        }
    }

    fn mutation(&self) -> Mutation {
        match self {
            Action::Create(_) => Mutation::Create,
            Action::Start(_) => Mutation::Start,
            Action::Stop(_) => Mutation::Stop,
            Action::Terminate(_) => Mutation::Terminate,
        }
    }
}

/// Deadline and poll budget shared by every wait within one operation.
struct PollClock {
    started: Instant,
    deadline: Instant,
    polls: u32,
    max_polls: u32,
}

impl PollClock {
    fn start(settings: &ReconcileSettings) -> Self {
        let started = Instant::now();
        Self {
            started,
            deadline: started + settings.timeout,
            polls: 0,
            max_polls: settings.max_polls,
        }
    }

    fn exhausted(&self) -> bool {
        self.polls >= self.max_polls || Instant::now() >= self.deadline
    }

    fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Computes and applies the provider calls that move a machine to a goal.
pub struct Reconciler<'a, G: ?Sized> {
    gateway: &'a G,
    observer: StateObserver<'a, G>,
    settings: ReconcileSettings,
    retry: RetryPolicy,
}

impl<'a, G: ProviderGateway + ?Sized> Reconciler<'a, G> {
    pub fn new(gateway: &'a G, settings: ReconcileSettings, retry: RetryPolicy) -> Self {
        Self {
            gateway,
            observer: StateObserver::new(gateway, retry),
            settings,
            retry,
        }
    }

    /// Ensure the machine named by `spec.name` is running, creating it from
    /// `spec` if it is absent or terminated.
    ///
    /// # Errors
    ///
    /// Returns `Timeout` if the machine does not reach `Running` in time; the
    /// issued action is neither rolled back nor repeated.
    pub async fn ensure_running(&self, spec: &InstanceSpec) -> Result<Outcome, ReconcileError> {
        self.drive(&spec.name, Target::Running(spec)).await
    }

    /// Ensure the machine is shut down. Absent and terminated machines are left alone.
    pub async fn ensure_stopped(&self, name: &MachineName) -> Result<Outcome, ReconcileError> {
        self.drive(name, Target::Stopped).await
    }

    /// Terminate the machine's instance. Absent and terminated machines are left alone.
    pub async fn destroy(&self, name: &MachineName) -> Result<Outcome, ReconcileError> {
        self.drive(name, Target::Destroyed).await
    }

    async fn drive(
        &self,
        name: &MachineName,
        target: Target<'_>,
    ) -> Result<Outcome, ReconcileError> {
        let goal = target.goal();
        let mut clock = PollClock::start(&self.settings);
        let mut current = self.observer.observe(name).await?;
        let mut retried_not_found = false;

        loop {
            let mutation = match plan(goal, current.state) {
                Step::Done => {
                    debug!(machine = %name, %goal, state = %current.state, "already converged");
                    return Ok(Outcome {
                        machine: current,
                        mutation: None,
                    });
                }
                _ if clock.exhausted() => {
                    return self.timed_out(name, goal, current.state, &clock);
                }
                Step::Wait => {
                    let settling = current.state;
                    debug!(machine = %name, state = %settling, "waiting for transient state to settle");
                    current = self
                        .poll_until(name, goal, settling, &mut clock, |state| state != settling)
                        .await?;
                    continue;
                }
                Step::Issue(mutation) => mutation,
            };

            // Re-plans count against the poll budget.
            let fresh = self.observer.observe(name).await?;
            if fresh.state != current.state || fresh.instance_id != current.instance_id {
                clock.polls += 1;
                info!(
                    machine = %name,
                    was = %current.state,
                    now = %fresh.state,
                    "machine changed before {mutation} was issued, re-planning"
                );
                current = fresh;
                continue;
            }

            let Some(action) = Action::bind(mutation, target, &fresh) else {
                clock.polls += 1;
                warn!(machine = %name, state = %fresh.state, "no live instance to {mutation}, re-observing");
                current = self.observer.observe(name).await?;
                continue;
            };

            match self.issue(action, &fresh).await {
                Ok(()) => {}
                Err(Exhausted {
                    error: ProviderError::NotFound(id),
                    ..
                }) => {
                    if retried_not_found {
                        return NotFoundSnafu {
                            name: name.clone(),
                            id,
                        }
                        .fail();
                    }
                    warn!(machine = %name, instance = %id, "instance vanished during {mutation}, re-observing");
                    retried_not_found = true;
                    current = self.observer.observe(name).await?;
                    continue;
                }
                Err(exhausted) => return Err(exhausted.into()),
            }

            let converged = self
                .poll_until(name, goal, fresh.state, &mut clock, |state| {
                    goal.is_satisfied_by(state)
                })
                .await?;

            info!(machine = %name, %mutation, state = %converged.state, "machine converged");
            return Ok(Outcome {
                machine: converged,
                mutation: Some(mutation),
            });
        }
    }

    /// Issue one provider call. Creation is never retried; it is not idempotent.
    async fn issue(&self, action: Action<'_>, machine: &Machine) -> Result<(), Exhausted> {
        let gateway = self.gateway;
        info!(machine = %machine.name, from = %machine.state, "issuing {}", action.mutation());

        match action {
            Action::Create(spec) => {
                let id = with_retry(&RetryPolicy::none(), "create instance", move || {
                    gateway.create_instance(spec)
                })
                .await?;
                info!(machine = %machine.name, instance = %id, "instance created");
                Ok(())
            }
            Action::Start(id) => {
                with_retry(&self.retry, "start instance", move || {
                    gateway.start_instance(id)
                })
                .await
            }
            Action::Stop(id) => {
                with_retry(&self.retry, "stop instance", move || {
                    gateway.stop_instance(id)
                })
                .await
            }
            Action::Terminate(id) => {
                with_retry(&self.retry, "terminate instance", move || {
                    gateway.terminate_instance(id)
                })
                .await
            }
        }
    }

    /// Observe every `poll_interval` until `done` holds or the clock runs out.
    async fn poll_until<F>(
        &self,
        name: &MachineName,
        goal: Goal,
        from: CanonicalState,
        clock: &mut PollClock,
        done: F,
    ) -> Result<Machine, ReconcileError>
    where
        F: Fn(CanonicalState) -> bool,
    {
        let mut last = from;

        loop {
            if clock.exhausted() {
                return self.timed_out(name, goal, last, clock);
            }

            tokio::time::sleep(self.settings.poll_interval).await;
            clock.polls += 1;

            let machine = self.observer.observe(name).await?;
            debug!(
                machine = %name,
                state = %machine.state,
                poll = clock.polls,
                "polled machine state"
            );

            if machine.state != last && !last.can_transition_to(machine.state) {
                debug!(
                    machine = %name,
                    from = %last,
                    to = %machine.state,
                    "state moved by more than one lifecycle step between polls"
                );
            }

            if done(machine.state) {
                return Ok(machine);
            }
            last = machine.state;
        }
    }

    fn timed_out<T>(
        &self,
        name: &MachineName,
        goal: Goal,
        last_state: CanonicalState,
        clock: &PollClock,
    ) -> Result<T, ReconcileError> {
        warn!(machine = %name, %goal, state = %last_state, polls = clock.polls, "gave up waiting");
        TimeoutSnafu {
            name: name.clone(),
            goal,
            last_state,
            waited: clock.elapsed(),
        }
        .fail()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn machine(state: CanonicalState, id: Option<&str>) -> Machine {
        let name = MachineName::new("web1").unwrap();
        Machine {
            instance_id: id.map(InstanceId::new),
            state,
            ..Machine::absent(name)
        }
    }

    #[test]
    fn live_mutations_carry_the_instance_id() {
        let stopped = machine(CanonicalState::Stopped, Some("42"));

        match Action::bind(Mutation::Start, Target::Stopped, &stopped) {
            Some(Action::Start(id)) => assert_eq!(id.as_str(), "42"),
            other => panic!("expected a bound start, got {other:?}"),
        }
    }

    #[test]
    fn create_carries_the_template() {
        let config = Config::default();
        let spec = config.instance_spec(&MachineName::new("web1").unwrap());
        let absent = machine(CanonicalState::Absent, None);

        let action = Action::bind(Mutation::Create, Target::Running(&spec), &absent);
        assert!(matches!(action, Some(Action::Create(s)) if s.name.as_str() == "web1"));
        assert_eq!(action.map(|a| a.mutation()), Some(Mutation::Create));
    }

    #[test]
    fn gone_machines_bind_nothing_but_create() {
        let terminated = machine(CanonicalState::Terminated, Some("42"));

        for mutation in [Mutation::Start, Mutation::Stop, Mutation::Terminate] {
            assert!(Action::bind(mutation, Target::Destroyed, &terminated).is_none());
        }
        assert!(Action::bind(Mutation::Create, Target::Stopped, &terminated).is_none());
    }
}
