//! Run identity and the fixture data derived from it
//!
//! Every name, e-mail and document number a scenario creates embeds the run
//! identity, so repeated or concurrent runs against the shared deployment do
//! not collide. Two runs drawing the same identity is an accepted risk.

use rand::Rng;
use serde::Serialize;
use std::fmt;

use crate::config::ConfigError;

/// Fixed password for every generated manager
pub const MANAGER_PASSWORD: &str = "senha1";

/// Randomized token scoping one scenario invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RunId(u32);

impl RunId {
    pub const MIN: u32 = 10000;
    pub const MAX: u32 = 99999;

    pub fn new(value: u32) -> Result<Self, ConfigError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(RunId(value))
        } else {
            Err(ConfigError::InvalidValue {
                field: "run_id",
                value: value.to_string(),
                reason: format!("must be between {} and {}", Self::MIN, Self::MAX),
            })
        }
    }

    pub fn random() -> Self {
        RunId(rand::thread_rng().gen_range(Self::MIN..=Self::MAX))
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    /// Two digits appended to every generated document number
    pub fn document_suffix(&self) -> String {
        format!("{:02}", self.0 / 1000)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ManagerFixture {
    pub name: String,
    /// CPF, 11 digits
    pub tax_id: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Address {
    pub street: String,
    pub number: String,
    pub district: String,
    pub city: String,
    pub postal_code: String,
}

/// Company or branch office form data
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationFixture {
    pub name: String,
    /// CNPJ, 14 digits
    pub tax_id: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub address: Address,
}

/// Everything a scenario types into the UI
#[derive(Debug, Clone, Serialize)]
pub struct Fixtures {
    pub run_id: RunId,
    pub manager: ManagerFixture,
    pub company: OrganizationFixture,
    pub branch_office: OrganizationFixture,
}

impl Fixtures {
    pub fn derive(run_id: RunId) -> Self {
        let id = run_id.value();
        let suffix = run_id.document_suffix();

        Fixtures {
            run_id,
            manager: ManagerFixture {
                name: "Gestor da Apresentação".to_string(),
                tax_id: format!("111222333{suffix}"),
                email: format!("gestor.demo.{id}@empresa.com"),
                password: MANAGER_PASSWORD.to_string(),
            },
            company: OrganizationFixture {
                name: format!("Empresa Demo {id}"),
                tax_id: format!("112223330001{suffix}"),
                email: format!("contato.demo.{id}@empresa.com"),
                phone: format!("119{id}"),
                password: "senhaDaEmpresaDemo".to_string(),
                address: Address {
                    street: "Rua da Demo".to_string(),
                    number: "123".to_string(),
                    district: "Bairro Demo".to_string(),
                    city: "Cidade Demo".to_string(),
                    postal_code: "12345000".to_string(),
                },
            },
            branch_office: OrganizationFixture {
                name: format!("Filial Principal {id}"),
                tax_id: format!("223334440001{suffix}"),
                email: format!("filial.demo.{id}@empresa.com"),
                phone: format!("219{id}"),
                password: "senhaDaFilialDemo".to_string(),
                address: Address {
                    street: "Avenida da Filial".to_string(),
                    number: "456".to_string(),
                    district: "Bairro Secundário".to_string(),
                    city: "Cidade Filial".to_string(),
                    postal_code: "54321000".to_string(),
                },
            },
        }
    }

    /// Document numbers in the order manager, company, branch office
    pub fn tax_ids(&self) -> [&str; 3] {
        [
            &self.manager.tax_id,
            &self.company.tax_id,
            &self.branch_office.tax_id,
        ]
    }
}

#[cfg(test)]
#[path = "fixtures_test.rs"]
mod fixtures_test;
