//! Scenario runner: the manager journey through the web UI
//!
//! Register, log in, create a company, open it, reach the branch-office
//! section and create a branch office. Any failure captures a screenshot and
//! ends the run. The handoff record is written on every exit path so that
//! teardown can remove whatever was created before the failure.

use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Settings;
use crate::fixtures::{Fixtures, OrganizationFixture};
use crate::handoff::{HandoffGuard, HandoffRecord};
use crate::types::{NavigationPath, Step};
use crate::webdriver::{Selector, UiDriver, UiError};

pub const SAVE_CLICK_SCREENSHOT: &str = "erro_click_salvar.png";
pub const TIMEOUT_SCREENSHOT: &str = "erro_inesperado_timeout.png";
pub const EXCEPTION_SCREENSHOT: &str = "erro_inesperado_exception.png";

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Step {} ({step}) failed: {source}", .step.number())]
    Step {
        step: Step,
        #[source]
        source: UiError,
    },
    #[error("Critical failure clicking the save company button: {source}")]
    SaveClick {
        #[source]
        source: UiError,
    },
    #[error(
        "Could not open company '{company}': {source}. Check for overlays or loading problems."
    )]
    CompanyAccess {
        company: String,
        #[source]
        source: UiError,
    },
    #[error("Scenario finished but the handoff record could not be written: {0:#}")]
    Handoff(anyhow::Error),
    #[error("Scenario interrupted before it finished")]
    Interrupted,
}

impl ScenarioError {
    fn at(step: Step) -> impl FnOnce(UiError) -> ScenarioError {
        move |source| ScenarioError::Step { step, source }
    }

    pub fn ui_error(&self) -> Option<&UiError> {
        match self {
            ScenarioError::Step { source, .. }
            | ScenarioError::SaveClick { source }
            | ScenarioError::CompanyAccess { source, .. } => Some(source),
            ScenarioError::Handoff(_) | ScenarioError::Interrupted => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        self.ui_error().is_some_and(UiError::is_timeout)
    }

    /// File name of the diagnostic screenshot for this failure
    pub fn screenshot_name(&self) -> Option<&'static str> {
        match self {
            ScenarioError::SaveClick { .. } => Some(SAVE_CLICK_SCREENSHOT),
            ScenarioError::Handoff(_) | ScenarioError::Interrupted => None,
            _ if self.is_timeout() => Some(TIMEOUT_SCREENSHOT),
            _ => Some(EXCEPTION_SCREENSHOT),
        }
    }
}

/// What a successful run did
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub run_id: u32,
    pub steps_completed: Vec<Step>,
    pub navigation: Option<NavigationPath>,
    pub handoff_file: PathBuf,
}

#[derive(Debug, Default)]
struct Progress {
    completed: Vec<Step>,
    navigation: Option<NavigationPath>,
}

pub struct ScenarioRunner<'a, D: UiDriver> {
    driver: &'a D,
    settings: &'a Settings,
    fixtures: Fixtures,
}

impl<'a, D: UiDriver> ScenarioRunner<'a, D> {
    pub fn new(driver: &'a D, settings: &'a Settings, fixtures: Fixtures) -> Self {
        ScenarioRunner {
            driver,
            settings,
            fixtures,
        }
    }

    /// Like [`run`](Self::run), but gives up once `shutdown` resolves
    ///
    /// The abandoned run still writes its handoff record before this returns.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<ScenarioReport, ScenarioError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            biased;
            result = self.run() => result,
            () = shutdown => {
                warn!("Interrupted, abandoning the flow");
                Err(ScenarioError::Interrupted)
            }
        }
    }

    pub async fn run(&self) -> Result<ScenarioReport, ScenarioError> {
        info!("Starting flow with run id {}", self.fixtures.run_id);

        let manager = &self.fixtures.manager;
        let record = HandoffRecord::new(&manager.email, &manager.password);
        let guard = HandoffGuard::arm(&self.settings.handoff_file, record);

        let mut progress = Progress::default();
        let outcome = self.execute(&mut progress).await;
        if let Err(e) = &outcome {
            self.capture_failure(e).await;
        }

        match (outcome, guard.commit()) {
            (Ok(()), Ok(handoff_file)) => Ok(ScenarioReport {
                run_id: self.fixtures.run_id.value(),
                steps_completed: progress.completed,
                navigation: progress.navigation,
                handoff_file,
            }),
            (Ok(()), Err(e)) => Err(ScenarioError::Handoff(e)),
            (Err(e), written) => {
                if let Err(write_err) = written {
                    warn!("Could not save handoff record: {:#}", write_err);
                }
                info!(
                    "Flow stopped after {} of {} steps",
                    progress.completed.len(),
                    Step::ALL.len()
                );
                Err(e)
            }
        }
    }

    async fn execute(&self, progress: &mut Progress) -> Result<(), ScenarioError> {
        for step in Step::ALL {
            info!("[FLOW] Step {}: {}", step.number(), step);
            match step {
                Step::Register => self.register().await.map_err(ScenarioError::at(step))?,
                Step::Login => self.login().await.map_err(ScenarioError::at(step))?,
                Step::CreateCompany => self.create_company().await?,
                Step::OpenCompany => self.open_company().await?,
                Step::OpenBranchOffices => {
                    let path = self
                        .open_branch_offices()
                        .await
                        .map_err(ScenarioError::at(step))?;
                    progress.navigation = Some(path);
                }
                Step::CreateBranchOffice => self
                    .create_branch_office()
                    .await
                    .map_err(ScenarioError::at(step))?,
            }
            progress.completed.push(step);
        }
        Ok(())
    }

    async fn capture_failure(&self, error: &ScenarioError) {
        let Some(name) = error.screenshot_name() else {
            return;
        };
        let path = self.settings.screenshot_dir.join(name);
        if let Err(e) = self.driver.save_screenshot(&path).await {
            warn!("Could not capture {}: {}", path.display(), e);
        }
    }

    async fn type_into(&self, id: &str, text: &str) -> Result<(), UiError> {
        let element = self.driver.find(&Selector::id(id)).await?;
        self.driver.type_text(&element, text).await
    }

    async fn click_id(&self, id: &str) -> Result<(), UiError> {
        let element = self.driver.find(&Selector::id(id)).await?;
        self.driver.click(&element).await
    }

    async fn register(&self) -> Result<(), UiError> {
        let timeouts = &self.settings.timeouts;
        let manager = &self.fixtures.manager;

        self.driver.goto(&self.settings.frontend_url).await?;
        self.driver.pause(ms(timeouts.after_load_ms)).await;

        let create_account = self
            .driver
            .wait_clickable(
                &Selector::button_with_text(&self.settings.labels.create_account),
                timeouts.element(),
            )
            .await?;
        self.driver.click(&create_account).await?;
        self.driver.pause(ms(timeouts.after_open_register_ms)).await;

        let cpf = self
            .driver
            .wait_visible(&Selector::id("cadastro-cpf"), timeouts.element())
            .await?;
        self.driver.type_text(&cpf, &manager.tax_id).await?;
        self.type_into("cadastro-nome", &manager.name).await?;
        self.type_into("cadastro-email", &manager.email).await?;
        self.type_into("cadastro-senha", &manager.password).await?;
        self.type_into("cadastro-confirmar-senha", &manager.password)
            .await?;
        self.click_id("cadastro-submit-button").await?;

        self.driver
            .wait_visible(&Selector::id("login-email"), timeouts.element())
            .await?;
        info!("Manager '{}' registered", manager.email);
        self.driver.pause(ms(timeouts.after_register_ms)).await;
        Ok(())
    }

    async fn login(&self) -> Result<(), UiError> {
        let timeouts = &self.settings.timeouts;
        let manager = &self.fixtures.manager;

        self.type_into("login-email", &manager.email).await?;
        self.type_into("login-senha", &manager.password).await?;
        self.click_id("login-submit-button").await?;

        self.driver
            .wait_visible(
                &Selector::heading(&self.settings.labels.companies_heading),
                timeouts.element(),
            )
            .await?;
        info!("Logged in");
        self.driver.pause(ms(timeouts.after_login_ms)).await;
        Ok(())
    }

    async fn create_company(&self) -> Result<(), ScenarioError> {
        let step = Step::CreateCompany;
        let timeouts = &self.settings.timeouts;
        let labels = &self.settings.labels;

        self.click_id("nova-empresa-button")
            .await
            .map_err(ScenarioError::at(step))?;
        self.fill_organization(&self.fixtures.company, &labels.company_state)
            .await
            .map_err(ScenarioError::at(step))?;

        // Pointer clicks on this button get lost intermittently
        self.save_company()
            .await
            .map_err(|source| ScenarioError::SaveClick { source })?;
        info!("Save company click dispatched");

        self.driver
            .wait_invisible(&Selector::id("nome"), timeouts.element())
            .await
            .map_err(ScenarioError::at(step))?;
        info!("Company form closed");
        Ok(())
    }

    async fn save_company(&self) -> Result<(), UiError> {
        let save = self
            .driver
            .wait_clickable(
                &Selector::id("salvar-empresa-button"),
                self.settings.timeouts.element(),
            )
            .await?;
        self.driver.scroll_into_view(&save, true).await?;
        self.driver
            .pause(ms(self.settings.timeouts.before_save_ms))
            .await;
        self.driver.js_click(&save).await
    }

    /// Fill the shared company/branch-office form and pick its state
    async fn fill_organization(
        &self,
        organization: &OrganizationFixture,
        state: &str,
    ) -> Result<(), UiError> {
        let name = self
            .driver
            .wait_visible(&Selector::id("nome"), self.settings.timeouts.element())
            .await?;
        self.driver.type_text(&name, &organization.name).await?;

        let address = &organization.address;
        for (id, value) in [
            ("cnpj", &organization.tax_id),
            ("email", &organization.email),
            ("telefone", &organization.phone),
            ("senha", &organization.password),
            ("logradouro", &address.street),
            ("numero", &address.number),
            ("bairro", &address.district),
            ("cidade", &address.city),
            ("cep", &address.postal_code),
        ] {
            self.type_into(id, value).await?;
        }

        self.select_option(state).await?;
        info!("State '{}' selected", state);
        Ok(())
    }

    async fn select_option(&self, label: &str) -> Result<(), UiError> {
        let timeout = self.settings.timeouts.element();

        let trigger = self
            .driver
            .wait_clickable(&Selector::combobox(), timeout)
            .await?;
        self.driver.click(&trigger).await?;

        // Items below the fold of the list are not interactable until scrolled to
        let option = self
            .driver
            .wait_clickable(&Selector::option(label), timeout)
            .await?;
        self.driver.scroll_into_view(&option, false).await?;
        self.driver.click(&option).await
    }

    async fn open_company(&self) -> Result<(), ScenarioError> {
        let company = &self.fixtures.company.name;
        let link = Selector::company_link(company, &self.settings.labels.access_company);

        let result = async {
            let element = self
                .driver
                .wait_clickable(&link, self.settings.timeouts.company_link())
                .await?;
            self.driver.click(&element).await
        }
        .await;

        result.map_err(|source| ScenarioError::CompanyAccess {
            company: company.clone(),
            source,
        })?;
        info!("Opened company '{}'", company);
        Ok(())
    }

    async fn open_branch_offices(&self) -> Result<NavigationPath, UiError> {
        let timeouts = &self.settings.timeouts;
        let link = Selector::link_containing(&self.settings.labels.branch_offices);

        info!("Trying the branch offices link directly (desktop layout)");
        match self
            .driver
            .wait_clickable(&link, timeouts.desktop_nav())
            .await
        {
            Ok(element) => {
                self.driver.click(&element).await?;
                self.driver.pause(ms(timeouts.after_navigation_ms)).await;
                return Ok(NavigationPath::Desktop);
            }
            Err(e) if e.is_timeout() => {}
            Err(e) => return Err(e),
        }

        info!("Link not visible, opening the sidebar menu (mobile layout)");
        let toggle = self
            .driver
            .wait_clickable(&Selector::menu_toggle(), timeouts.element())
            .await?;
        self.driver.click(&toggle).await?;
        self.driver.pause(ms(timeouts.menu_animation_ms)).await;

        // The link may still be sliding in, a pointer click could land early
        let element = self.driver.wait_clickable(&link, timeouts.element()).await?;
        self.driver.js_click(&element).await?;
        Ok(NavigationPath::Mobile)
    }

    async fn create_branch_office(&self) -> Result<(), UiError> {
        let timeouts = &self.settings.timeouts;
        self.driver.pause(ms(timeouts.before_branch_form_ms)).await;

        let new_branch = self
            .driver
            .wait_clickable(&Selector::id("nova-filial-button"), timeouts.element())
            .await?;
        self.driver.click(&new_branch).await?;

        self.fill_organization(
            &self.fixtures.branch_office,
            &self.settings.labels.branch_office_state,
        )
        .await?;
        self.driver.pause(ms(timeouts.before_branch_save_ms)).await;

        let save = self.driver.find(&Selector::id("salvar-filial-button")).await?;
        self.driver.js_click(&save).await?;
        info!(
            "Branch office '{}' submitted",
            self.fixtures.branch_office.name
        );

        // Not verified further, the settle pause is all we wait for
        self.driver.pause(ms(timeouts.after_branch_save_ms)).await;
        Ok(())
    }
}

fn ms(millis: u64) -> std::time::Duration {
    std::time::Duration::from_millis(millis)
}
