// The selection shared between runs: the question, the year and the
// demographic that were looked at last.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::mas::config_reader::{Dashboard, Demographic, QuestionConfig};
use crate::mas::*;

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionContext {
    #[serde(rename = "selectedQuestion")]
    pub selected_question: Option<String>,
    #[serde(rename = "selectedYear")]
    pub selected_year: Option<u32>,
    #[serde(rename = "savedDemographic")]
    pub saved_demographic: Option<String>,
}

impl SessionContext {
    /// Reads a session file. A missing file is an empty session.
    pub fn load(path: &str) -> MasResult<SessionContext> {
        if !Path::new(path).exists() {
            info!("SessionContext::load: no session at {:?}, starting a new one", path);
            return Ok(SessionContext::default());
        }
        let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
    }

    pub fn save(&self, path: &str) -> MasResult<()> {
        let js = serde_json::to_string_pretty(self).context(SerializingJsonSnafu {})?;
        fs::write(path, js).context(WritingFileSnafu { path })
    }

    /// The explicit question, else the session one if it is still in the
    /// catalog, else the first question of the catalog.
    pub fn question<'a>(
        &self,
        explicit: Option<&str>,
        dashboard: &'a Dashboard,
    ) -> MasResult<&'a QuestionConfig> {
        if let Some(name) = explicit {
            return dashboard.question(name).context(UnknownQuestionSnafu {
                question: name.to_string(),
            });
        }
        if let Some(q) = self
            .selected_question
            .as_deref()
            .and_then(|name| dashboard.question(name))
        {
            debug!("SessionContext::question: using {:?} from the session", q.code);
            return Ok(q);
        }
        match dashboard.questions.first() {
            Some(q) => Ok(q),
            None => whatever!("The configuration lists no question"),
        }
    }

    /// The explicit year, else the session one if the question has data for
    /// it, else the most recent year. `available` is sorted most recent first.
    pub fn year(&self, explicit: Option<u32>, available: &[u32]) -> Option<u32> {
        if explicit.is_some() {
            return explicit;
        }
        match self.selected_year {
            Some(y) if available.contains(&y) => Some(y),
            _ => available.first().cloned(),
        }
    }

    /// The explicit demographic, else the saved one, else the first configured.
    pub fn demographic<'a>(
        &self,
        explicit: Option<&str>,
        dashboard: &'a Dashboard,
    ) -> MasResult<&'a Demographic> {
        if let Some(name) = explicit {
            return dashboard.demographic(name).context(UnknownDemographicSnafu {
                demographic: name.to_string(),
            });
        }
        if let Some(d) = self
            .saved_demographic
            .as_deref()
            .and_then(|name| dashboard.demographic(name))
        {
            return Ok(d);
        }
        match dashboard.demographics.first() {
            Some(d) => Ok(d),
            None => whatever!("The configuration lists no demographic"),
        }
    }

    /// The session after a run. Values that were not resolved are kept.
    pub fn updated(
        &self,
        question: &str,
        year: Option<u32>,
        demographic: Option<&str>,
    ) -> SessionContext {
        SessionContext {
            selected_question: Some(question.to_string()),
            selected_year: year.or(self.selected_year),
            saved_demographic: demographic
                .map(|d| d.to_string())
                .or_else(|| self.saved_demographic.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mas::config_reader::{default_config, validate_config};

    fn dashboard() -> Dashboard {
        validate_config(&default_config().unwrap()).unwrap()
    }

    #[test]
    fn explicit_choices_win() {
        let dash = dashboard();
        let session = SessionContext {
            selected_question: Some("findjob".to_string()),
            selected_year: Some(2023),
            saved_demographic: Some("Race".to_string()),
        };
        assert_eq!(session.question(Some("emerg"), &dash).unwrap().code, "emerg");
        assert_eq!(session.year(Some(2020), &[2025, 2024]), Some(2020));
        assert_eq!(
            session.demographic(Some("Gender"), &dash).unwrap().name,
            "Gender"
        );
    }

    #[test]
    fn session_then_defaults() {
        let dash = dashboard();
        let session = SessionContext {
            selected_question: Some("emerg".to_string()),
            selected_year: Some(2024),
            saved_demographic: Some("Race".to_string()),
        };
        assert_eq!(session.question(None, &dash).unwrap().code, "emerg");
        assert_eq!(session.year(None, &[2025, 2024]), Some(2024));
        // 2024 is not available for this question: latest year.
        assert_eq!(session.year(None, &[2025, 2023]), Some(2025));
        assert_eq!(session.demographic(None, &dash).unwrap().name, "Race");

        let empty = SessionContext::default();
        assert_eq!(empty.question(None, &dash).unwrap().code, "bigprob");
        assert_eq!(empty.year(None, &[]), None);
        assert_eq!(empty.demographic(None, &dash).unwrap().name, "Jurisdiction");
    }

    #[test]
    fn unknown_selections() {
        let dash = dashboard();
        let session = SessionContext::default();
        assert!(matches!(
            session.question(Some("nope"), &dash),
            Err(MasError::UnknownQuestion { .. })
        ));
        assert!(matches!(
            session.demographic(Some("Shoe size"), &dash),
            Err(MasError::UnknownDemographic { .. })
        ));
    }

    #[test]
    fn save_and_load() {
        let path = std::env::temp_dir().join("masdash_session_test.json");
        let path = path.to_str().unwrap();
        let _ = fs::remove_file(path);
        assert_eq!(SessionContext::load(path).unwrap(), SessionContext::default());

        let session = SessionContext::default().updated("emerg", Some(2025), Some("Income"));
        session.save(path).unwrap();
        assert_eq!(SessionContext::load(path).unwrap(), session);
        let _ = fs::remove_file(path);
    }
}
