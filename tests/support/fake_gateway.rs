// ABOUTME: Scripted in-memory provider gateway for reconciler and observer tests.
// ABOUTME: Each instance replays a queue of provider states, one per listing, and every call is logged.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use vs::machine::Mutation;
use vs::provider::{
    ConsoleAccess, InstanceRecord, InstanceSpec, MANAGED_TAG, NAME_TAG, ProviderError,
    ProviderGateway,
};
use vs::types::{InstanceId, MachineName};

/// A gateway call, as seen by the fake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(Option<String>),
    Create(String),
    Start(InstanceId),
    Stop(InstanceId),
    Terminate(InstanceId),
    Console(InstanceId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    List,
    Create,
    Start,
    Stop,
    Terminate,
    Console,
}

pub struct FakeInstance {
    pub id: InstanceId,
    pub name: String,
    pub tags: BTreeMap<String, String>,
    pub address: Option<String>,
    /// Front is the current state; it advances after each listing, and the last entry sticks.
    pub states: VecDeque<String>,
}

impl FakeInstance {
    fn record(&self) -> InstanceRecord {
        InstanceRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            state: self.states.front().cloned().unwrap_or_default(),
            instance_type: Some("cx22".to_string()),
            public_address: self.address.clone(),
            tags: self.tags.clone(),
        }
    }

    fn advance(&mut self) {
        if self.states.len() > 1 {
            self.states.pop_front();
        }
    }
}

type Change = Box<dyn FnOnce(&mut FakeState) + Send>;

pub struct FakeState {
    pub instances: Vec<FakeInstance>,
    calls: Vec<Call>,
    next_id: u64,
    scripts: HashMap<Op, Vec<String>>,
    failures: HashMap<Op, VecDeque<ProviderError>>,
    after_list: BTreeMap<usize, Vec<Change>>,
    ignore_filter: bool,
}

impl FakeState {
    fn find(&mut self, id: &InstanceId) -> Option<&mut FakeInstance> {
        self.instances.iter_mut().find(|instance| &instance.id == id)
    }

    /// Replace an instance's state queue.
    pub fn set_states(&mut self, id: &InstanceId, states: &[&str]) {
        if let Some(instance) = self.find(id) {
            instance.states = states.iter().map(|s| s.to_string()).collect();
        }
    }

    pub fn remove(&mut self, id: &InstanceId) {
        self.instances.retain(|instance| &instance.id != id);
    }

    /// Add an instance tagged with `name`, as another client would.
    pub fn add_tagged(&mut self, name: &str, states: &[&str]) -> InstanceId {
        self.add_raw(name, machine_tags(name), states)
    }

    fn add_raw(
        &mut self,
        name: &str,
        tags: BTreeMap<String, String>,
        states: &[&str],
    ) -> InstanceId {
        self.next_id += 1;
        let id = InstanceId::new(self.next_id.to_string());
        let address = format!("203.0.113.{}", self.next_id % 250);
        self.instances.push(FakeInstance {
            id: id.clone(),
            name: name.to_string(),
            tags,
            address: Some(address),
            states: strings(states).into(),
        });
        id
    }

    fn fail(&mut self, op: Op) -> Result<(), ProviderError> {
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn script(&self, op: Op) -> VecDeque<String> {
        self.scripts
            .get(&op)
            .map(|states| states.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn mutate(&mut self, op: Op, id: &InstanceId) -> Result<(), ProviderError> {
        self.fail(op)?;
        let script = self.script(op);
        // An empty script makes the provider forget the instance at once.
        if script.is_empty() && self.find(id).is_some() {
            self.remove(id);
            return Ok(());
        }
        match self.find(id) {
            Some(instance) => {
                instance.states = script;
                Ok(())
            }
            None => Err(ProviderError::NotFound(id.clone())),
        }
    }
}

pub struct FakeGateway {
    state: Mutex<FakeState>,
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGateway {
    /// An empty account. Created instances go initializing → running, started
    /// ones starting → running, stopped ones stopping → off, terminated ones
    /// deleting → terminated.
    pub fn new() -> Self {
        let mut scripts = HashMap::new();
        scripts.insert(Op::Create, strings(&["initializing", "running"]));
        scripts.insert(Op::Start, strings(&["starting", "running"]));
        scripts.insert(Op::Stop, strings(&["stopping", "off"]));
        scripts.insert(Op::Terminate, strings(&["deleting", "terminated"]));

        FakeGateway {
            state: Mutex::new(FakeState {
                instances: Vec::new(),
                calls: Vec::new(),
                next_id: 1000,
                scripts,
                failures: HashMap::new(),
                after_list: BTreeMap::new(),
                ignore_filter: false,
            }),
        }
    }

    /// Add an instance tagged with `name` that replays `states`.
    pub fn with_instance(self, name: &str, states: &[&str]) -> Self {
        let _id = self.add_instance(name, states);
        self
    }

    pub fn add_instance(&self, name: &str, states: &[&str]) -> InstanceId {
        self.state.lock().add_tagged(name, states)
    }

    /// Answer every listing with all instances, like a provider with a loose label match.
    pub fn ignore_filter(&self) {
        self.state.lock().ignore_filter = true;
    }

    /// Add an instance with arbitrary tags.
    pub fn add_raw(&self, name: &str, tags: BTreeMap<String, String>, states: &[&str]) -> InstanceId {
        self.state.lock().add_raw(name, tags, states)
    }

    /// States an instance replays after `op` is accepted.
    pub fn script(&self, op: Op, states: &[&str]) {
        self.state.lock().scripts.insert(op, strings(states));
    }

    /// Make the next call of `op` fail with `error`. Queued failures are consumed in order.
    pub fn fail_next(&self, op: Op, error: ProviderError) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Apply `change` right after the `n`-th listing (1-based) has been answered.
    pub fn after_list<F>(&self, n: usize, change: F)
    where
        F: FnOnce(&mut FakeState) + Send + 'static,
    {
        self.state
            .lock()
            .after_list
            .entry(n)
            .or_default()
            .push(Box::new(change));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn list_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::List(_)))
            .count()
    }

    /// Every accepted or attempted mutation, in order.
    pub fn mutations(&self) -> Vec<Mutation> {
        self.calls()
            .iter()
            .filter_map(|call| match call {
                Call::Create(_) => Some(Mutation::Create),
                Call::Start(_) => Some(Mutation::Start),
                Call::Stop(_) => Some(Mutation::Stop),
                Call::Terminate(_) => Some(Mutation::Terminate),
                Call::List(_) | Call::Console(_) => None,
            })
            .collect()
    }

    pub fn instance_ids(&self) -> Vec<InstanceId> {
        self.state
            .lock()
            .instances
            .iter()
            .map(|instance| instance.id.clone())
            .collect()
    }

    pub fn last_created_labels(&self) -> Option<BTreeMap<String, String>> {
        self.state.lock().instances.last().map(|instance| instance.tags.clone())
    }
}

fn machine_tags(name: &str) -> BTreeMap<String, String> {
    let mut tags = BTreeMap::new();
    tags.insert(NAME_TAG.to_string(), name.to_string());
    tags.insert(MANAGED_TAG.to_string(), "true".to_string());
    tags
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[async_trait]
impl ProviderGateway for FakeGateway {
    async fn list_instances(
        &self,
        name_tag: Option<&MachineName>,
    ) -> Result<Vec<InstanceRecord>, ProviderError> {
        let mut state = self.state.lock();
        state
            .calls
            .push(Call::List(name_tag.map(|name| name.to_string())));
        state.fail(Op::List)?;

        let ignore_filter = state.ignore_filter;
        let mut records = Vec::new();
        for instance in state.instances.iter_mut() {
            let matches = match name_tag {
                Some(name) if !ignore_filter => {
                    instance.tags.get(NAME_TAG).map(String::as_str) == Some(name.as_str())
                }
                _ => true,
            };
            if matches {
                records.push(instance.record());
                instance.advance();
            }
        }

        let listed = state.calls.iter().filter(|c| matches!(c, Call::List(_))).count();
        if let Some(changes) = state.after_list.remove(&listed) {
            for change in changes {
                change(&mut *state);
            }
        }

        Ok(records)
    }

    async fn create_instance(&self, spec: &InstanceSpec) -> Result<InstanceId, ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Create(spec.name.to_string()));
        state.fail(Op::Create)?;

        let states = state.script(Op::Create);
        let id = state.add_raw(spec.name.as_str(), spec.provider_labels(), &[]);
        if let Some(instance) = state.find(&id) {
            instance.states = states;
        }
        Ok(id)
    }

    async fn start_instance(&self, id: &InstanceId) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Start(id.clone()));
        state.mutate(Op::Start, id)
    }

    async fn stop_instance(&self, id: &InstanceId) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Stop(id.clone()));
        state.mutate(Op::Stop, id)
    }

    async fn terminate_instance(&self, id: &InstanceId) -> Result<(), ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Terminate(id.clone()));
        state.mutate(Op::Terminate, id)
    }

    async fn request_console(&self, id: &InstanceId) -> Result<ConsoleAccess, ProviderError> {
        let mut state = self.state.lock();
        state.calls.push(Call::Console(id.clone()));
        state.fail(Op::Console)?;
        match state.find(id) {
            Some(_) => Ok(ConsoleAccess {
                url: format!("wss://console.example/{id}"),
                password: "secret".to_string(),
            }),
            None => Err(ProviderError::NotFound(id.clone())),
        }
    }
}
