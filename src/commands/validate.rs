use crate::output::UserOutput;
use mosi_controller::serial::{self, ValidationState};
use mosi_controller::Error;
use serde::Serialize;

#[derive(Serialize)]
struct ValidateReport<'a> {
    normalized: &'a str,
    state: ValidationState,
    can_connect: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

pub fn run_validate(input: &str, json: bool, out: &dyn UserOutput) -> anyhow::Result<()> {
    let validation = serial::validate(input);

    if json {
        let report = ValidateReport {
            normalized: &validation.normalized,
            state: validation.state,
            can_connect: validation.can_connect(),
            message: validation.message(),
        };
        out.data(&serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    match validation.state {
        ValidationState::Invalid => Err(Error::InvalidFormat(validation.normalized).into()),
        ValidationState::Empty => {
            out.data("empty");
            Ok(())
        }
        state => {
            out.data(&format!("{}\t{}", validation.normalized, state));
            if state == ValidationState::Partial {
                out.status("Keep typing: serial numbers are 'EM' followed by four digits.");
            }
            Ok(())
        }
    }
}
