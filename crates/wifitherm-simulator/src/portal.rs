use std::io::{BufRead, Write};
use std::path::PathBuf;

use log::info;
use wifitherm_core::provisioning::{
    CaptivePortal, PortalError, PortalParameter, PortalValues, ProvisioningTrigger,
};

/// Asks for the portal fields on the terminal.
///
/// An empty answer takes the parameter's default; end of input abandons the
/// portal.
pub struct TerminalPortal;

impl CaptivePortal for TerminalPortal {
    async fn collect(
        &mut self,
        ap_name: &str,
        parameters: &[PortalParameter],
    ) -> Result<PortalValues, PortalError> {
        info!("Captive portal {} waiting for input", ap_name);
        println!("== {ap_name} setup ==");

        let stdin = std::io::stdin();
        let mut values = PortalValues::new();
        for parameter in parameters {
            print!("{} [{}]: ", parameter.id, parameter.label);
            std::io::stdout()
                .flush()
                .map_err(|_| PortalError::Io { operation: "prompt" })?;

            let mut line = String::new();
            let read = stdin
                .lock()
                .read_line(&mut line)
                .map_err(|_| PortalError::Io { operation: "read" })?;
            if read == 0 {
                return Err(PortalError::Abandoned);
            }

            let answer = line.trim_end_matches(['\r', '\n']);
            let value = if answer.is_empty() {
                parameter.default
            } else {
                answer
            };
            values.insert(parameter.id, value);
        }
        Ok(values)
    }
}

/// Provisioning "button" held down while a marker file exists.
pub struct FileTrigger {
    path: PathBuf,
}

impl FileTrigger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ProvisioningTrigger for FileTrigger {
    fn is_asserted(&mut self) -> bool {
        self.path.exists()
    }
}
