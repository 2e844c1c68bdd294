//! Geometry engine backed by a live host session
//!
//! Translates each [`GeometryEngine`] call into host commands (see
//! [`crate::dialect`]) and interprets the JSON values the host returns.

use ahash::AHashSet;
use serde_json::Value;

use crate::connection::{establish_connection, HostConnection};
use crate::dialect;
use crate::engine::{
    AtomLocator, GeometryEngine, Preparation, ResidueLocator, StructureHandle, StructureSource,
    Torsion,
};
use crate::error::{HostError, HostResult};
use crate::settings::HostSettings;
use crate::transcript::CommandTranscript;

/// Host session driving the external geometry engine
pub struct HostSession {
    connection: HostConnection,
    transcript: Option<CommandTranscript>,
    open_models: AHashSet<u32>,
}

impl HostSession {
    /// Wrap an established connection
    pub fn new(connection: HostConnection) -> Self {
        Self {
            connection,
            transcript: None,
            open_models: AHashSet::new(),
        }
    }

    /// Connect (or spawn) according to the settings
    pub fn connect(settings: &HostSettings) -> HostResult<Self> {
        let connection = establish_connection(settings)?;
        let mut session = Self::new(connection);
        if let Some(path) = &settings.transcript {
            session = session.with_transcript(CommandTranscript::create(path)?);
        }
        Ok(session)
    }

    /// Record every command to a transcript
    pub fn with_transcript(mut self, transcript: CommandTranscript) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Number of models this session currently has open
    pub fn open_model_count(&self) -> usize {
        self.open_models.len()
    }

    /// Check that the host still answers
    pub fn ping(&mut self) -> HostResult<bool> {
        self.connection.client_mut().ping()
    }

    fn execute(&mut self, command: &str) -> HostResult<()> {
        if let Some(transcript) = &mut self.transcript {
            transcript.record(command);
        }
        self.connection.client_mut().execute(command)
    }

    fn query(&mut self, command: &str) -> HostResult<Value> {
        if let Some(transcript) = &mut self.transcript {
            transcript.record(command);
        }
        self.connection.client_mut().query(command)
    }

    fn check_open(&self, handle: &StructureHandle) -> HostResult<u32> {
        if self.open_models.contains(&handle.model()) {
            Ok(handle.model())
        } else {
            Err(HostError::UnknownHandle(handle.model()))
        }
    }

    fn prepare(&mut self, model: u32, preparation: &Preparation) -> HostResult<()> {
        if let Some(chain) = &preparation.keep_chain {
            self.execute(&dialect::keep_only_chain(model, chain))?;
        }
        if preparation.strip_solvent {
            self.execute(&dialect::delete_solvent(model))?;
        }
        if preparation.strip_ligands {
            self.execute(&dialect::delete_ligand(model))?;
        }
        if preparation.renumber_to_reference {
            self.execute(&dialect::renumber_to_uniprot(model))?;
        }
        Ok(())
    }
}

impl GeometryEngine for HostSession {
    fn open_structure(
        &mut self,
        source: &StructureSource,
        preparation: &Preparation,
    ) -> HostResult<StructureHandle> {
        let value = self.query(&dialect::open(source))?;
        let model = model_number(&value)?;
        self.open_models.insert(model);
        log::debug!("Opened {} as model #{}", source, model);

        if let Err(e) = self.prepare(model, preparation) {
            match self.execute(&dialect::close(model)) {
                Ok(()) => {
                    self.open_models.remove(&model);
                }
                Err(close_err) => {
                    log::warn!("Failed to close model #{} after error: {}", model, close_err);
                    if let Err(all_err) = self.close_all() {
                        log::warn!("Failed to close all models: {}", all_err);
                    }
                }
            }
            return Err(e);
        }

        Ok(StructureHandle::new(model, source.clone()))
    }

    fn close_structure(&mut self, handle: &StructureHandle) -> HostResult<()> {
        let model = self.check_open(handle)?;
        self.execute(&dialect::close(model))?;
        self.open_models.remove(&model);
        Ok(())
    }

    fn close_all(&mut self) -> HostResult<()> {
        self.execute(&dialect::close_all())?;
        self.open_models.clear();
        Ok(())
    }

    fn select_residue(
        &mut self,
        handle: &StructureHandle,
        residue: &ResidueLocator,
    ) -> HostResult<Vec<String>> {
        let model = self.check_open(handle)?;
        let value = self.query(&dialect::select(model, residue))?;
        residue_names(value)
    }

    fn compute_distance(
        &mut self,
        handle: &StructureHandle,
        from: &AtomLocator,
        to: &AtomLocator,
    ) -> HostResult<f64> {
        let model = self.check_open(handle)?;
        let value = self.query(&dialect::distance(model, from, to))?;
        number(&value)?.ok_or_else(|| HostError::malformed("distance is undefined"))
    }

    fn compute_sesa(
        &mut self,
        handle: &StructureHandle,
        residue: &ResidueLocator,
    ) -> HostResult<f64> {
        let model = self.check_open(handle)?;
        self.execute(&dialect::select(model, residue))?;
        self.execute(&dialect::surface_selection())?;
        let value = self.query(&dialect::measure_selection_area())?;
        number(&value)?.ok_or_else(|| HostError::malformed("surface area is undefined"))
    }

    fn compute_backbone_torsion(
        &mut self,
        handle: &StructureHandle,
        residue: &ResidueLocator,
    ) -> HostResult<Torsion> {
        let model = self.check_open(handle)?;
        let phi = self.query(&dialect::residue_attribute(
            model,
            residue,
            dialect::PHI_ATTRIBUTE,
        ))?;
        let psi = self.query(&dialect::residue_attribute(
            model,
            residue,
            dialect::PSI_ATTRIBUTE,
        ))?;
        Ok(Torsion::new(number(&phi)?, number(&psi)?))
    }
}

/// Model number from the value returned by `open`
///
/// Accepts `1`, `[1]`, `"#1"` or `["#1"]`.
fn model_number(value: &Value) -> HostResult<u32> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().trim_start_matches('#').parse().ok(),
        Value::Array(items) => {
            let first = items
                .first()
                .ok_or_else(|| HostError::malformed("open returned no models"))?;
            return model_number(first);
        }
        _ => None,
    };
    parsed.ok_or_else(|| HostError::malformed(format!("not a model number: {}", value)))
}

/// Residue names from the value returned by `select`
fn residue_names(value: Value) -> HostResult<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(name) => Ok(vec![name]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Ok(name),
                other => Err(HostError::malformed(format!("not a residue name: {}", other))),
            })
            .collect(),
        other => Err(HostError::malformed(format!(
            "expected residue names, got {}",
            other
        ))),
    }
}

/// Optional number; `null` means undefined
fn number(value: &Value) -> HostResult<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| HostError::malformed(format!("not a number: {:?}", s))),
        other => Err(HostError::malformed(format!("not a number: {}", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ipc::{HostClient, HostRequest, HostResponse};
    use serde_json::json;
    use std::io::{BufRead, BufReader, Write};
    use std::os::unix::net::UnixStream;
    use std::thread;
    use std::time::Duration;

    /// Run a host that answers each command through `answer`
    fn fake_host<F>(answer: F) -> (HostSession, thread::JoinHandle<Vec<String>>)
    where
        F: Fn(&str) -> Result<Value, String> + Send + 'static,
    {
        let (client_end, host_end) = UnixStream::pair().unwrap();
        let handle = thread::spawn(move || {
            let mut reader = BufReader::new(host_end.try_clone().unwrap());
            let mut writer = host_end;
            let mut commands = Vec::new();
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 {
                    break;
                }
                let request: HostRequest = serde_json::from_str(line.trim_end()).unwrap();
                let response = match request {
                    HostRequest::Execute { id, command } | HostRequest::Query { id, command } => {
                        let result = answer(&command);
                        commands.push(command);
                        match result {
                            Ok(value) => HostResponse::Value { id, value },
                            Err(message) => HostResponse::Error { id, message },
                        }
                    }
                    HostRequest::Ping { id } => HostResponse::Pong { id },
                    HostRequest::Quit => break,
                    HostRequest::Hello { .. } => continue,
                };
                let text = serde_json::to_string(&response).unwrap();
                if writeln!(writer, "{}", text).is_err() {
                    break;
                }
            }
            commands
        });
        let client = HostClient::from_stream(client_end, Some(Duration::from_secs(5))).unwrap();
        (HostSession::new(HostConnection::from_client(client)), handle)
    }

    fn answer(command: &str) -> Result<Value, String> {
        match command {
            "open 1a3n" => Ok(json!(["#1"])),
            "select #1/A:58" => Ok(json!(["ASN"])),
            "select #1/A:99" => Ok(json!([])),
            "distance #1/A:58@ND2 #1/A:58@C" => Ok(json!(2.41)),
            "measure area sel includeMasked false" => Ok(json!(45.27)),
            "info residues #1/A:58 attribute phi" => Ok(Value::Null),
            "info residues #1/A:58 attribute psi" => Ok(json!(-45.5)),
            "open 9zzz" => Err("Fetching 9zzz failed".to_string()),
            "open 2bad" => Ok(json!(2)),
            "delete #2 & ~#2/Z" => Err("no chain Z".to_string()),
            "open 3flk" => Ok(json!(3)),
            "close #3" => Err("close failed".to_string()),
            _ => Ok(Value::Null),
        }
    }

    #[test]
    fn test_full_measurement_cycle() {
        let (mut session, host) = fake_host(answer);
        let source = StructureSource::experimental("1a3n");
        let preparation = Preparation::stripped()
            .with_chain(Some("A".into()))
            .with_renumbering(true);

        let handle = session.open_structure(&source, &preparation).unwrap();
        assert_eq!(handle.model(), 1);
        assert_eq!(session.open_model_count(), 1);

        let res = ResidueLocator::new(Some("A"), 58);
        assert_eq!(session.select_residue(&handle, &res).unwrap(), vec!["ASN"]);
        assert!(session
            .select_residue(&handle, &ResidueLocator::new(Some("A"), 99))
            .unwrap()
            .is_empty());
        let d = session
            .compute_distance(&handle, &res.atom("ND2"), &res.atom("C"))
            .unwrap();
        assert!((d - 2.41).abs() < 1e-9);
        let area = session.compute_sesa(&handle, &res).unwrap();
        assert!((area - 45.27).abs() < 1e-9);
        let torsion = session.compute_backbone_torsion(&handle, &res).unwrap();
        assert_eq!(torsion, Torsion::new(None, Some(-45.5)));

        session.close_structure(&handle).unwrap();
        assert_eq!(session.open_model_count(), 0);
        drop(session);

        let commands = host.join().unwrap();
        assert_eq!(
            &commands[..5],
            &[
                "open 1a3n",
                "delete #1 & ~#1/A",
                "delete solvent & #1",
                "delete ligand & #1",
                "setattr #1 structures res_numbering uniprot",
            ]
        );
        assert_eq!(commands.last().map(String::as_str), Some("close #1"));
    }

    #[test]
    fn test_open_failure_is_command_error() {
        let (mut session, _host) = fake_host(answer);
        let err = session
            .open_structure(&StructureSource::experimental("9zzz"), &Preparation::none())
            .unwrap_err();
        assert!(matches!(err, HostError::Command(_)));
        assert_eq!(session.open_model_count(), 0);
    }

    #[test]
    fn test_failed_preparation_closes_model() {
        let (mut session, host) = fake_host(answer);
        let preparation = Preparation::none().with_chain(Some("Z".into()));
        let err = session
            .open_structure(&StructureSource::experimental("2bad"), &preparation)
            .unwrap_err();
        assert!(matches!(err, HostError::Command(ref m) if m == "no chain Z"));
        assert_eq!(session.open_model_count(), 0);
        drop(session);
        let commands = host.join().unwrap();
        assert_eq!(commands.last().map(String::as_str), Some("close #2"));
    }

    #[test]
    fn test_closed_handle_is_rejected() {
        let (mut session, _host) = fake_host(answer);
        let handle = session
            .open_structure(&StructureSource::experimental("1a3n"), &Preparation::none())
            .unwrap();
        session.close_structure(&handle).unwrap();
        let err = session
            .select_residue(&handle, &ResidueLocator::new(Some("A"), 58))
            .unwrap_err();
        assert!(matches!(err, HostError::UnknownHandle(1)));
    }

    #[test]
    fn test_failed_close_keeps_model_tracked() {
        let (mut session, host) = fake_host(answer);
        let handle = session
            .open_structure(&StructureSource::experimental("3flk"), &Preparation::none())
            .unwrap();
        assert!(session.close_structure(&handle).is_err());
        assert_eq!(session.open_model_count(), 1);

        session.close_all().unwrap();
        assert_eq!(session.open_model_count(), 0);
        drop(session);
        let commands = host.join().unwrap();
        assert_eq!(&commands[commands.len() - 2..], &["close #3", "close all"]);
    }

    #[test]
    fn test_value_parsing() {
        assert_eq!(model_number(&json!(3)).unwrap(), 3);
        assert_eq!(model_number(&json!("#4")).unwrap(), 4);
        assert_eq!(model_number(&json!(["#5", "#6"])).unwrap(), 5);
        assert!(model_number(&json!([])).is_err());
        assert!(model_number(&json!({"model": 1})).is_err());

        assert_eq!(residue_names(Value::Null).unwrap(), Vec::<String>::new());
        assert!(residue_names(json!([1])).is_err());

        assert_eq!(number(&json!("12.5")).unwrap(), Some(12.5));
        assert_eq!(number(&Value::Null).unwrap(), None);
        assert!(matches!(number(&json!(true)), Err(HostError::Malformed(_))));
    }
}
