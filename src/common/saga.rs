// src/common/saga.rs

//! Compensações para as operações que atravessam banco local e provedor remoto.
//!
//! Cada passo "para frente" que deixa rastro local registra a sua ação de
//! desfazer. Se um passo posterior falhar, as compensações rodam na ordem
//! inversa do registro. Falhas de compensação são coletadas e logadas, mas o
//! erro devolvido ao chamador é sempre o erro original.

use std::{future::Future, pin::Pin};

use crate::common::error::AppError;

type CompensationFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send>>;
type CompensationAction = Box<dyn FnOnce() -> CompensationFuture + Send>;

pub struct CompensationFailure {
    pub step: String,
    pub error: AppError,
}

#[derive(Default)]
pub struct CompensationReport {
    pub executed: Vec<String>,
    pub failures: Vec<CompensationFailure>,
}

impl CompensationReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Default)]
pub struct Compensations {
    steps: Vec<(String, CompensationAction)>,
}

impl Compensations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<F, Fut>(&mut self, step: impl Into<String>, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let action: CompensationAction = Box::new(move || Box::pin(action()) as CompensationFuture);
        self.steps.push((step.into(), action));
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Descarta as compensações: o trecho protegido foi confirmado.
    pub fn commit(mut self) {
        self.steps.clear();
    }

    /// Executa tudo em ordem inversa. Nunca para no meio por causa de uma falha.
    pub async fn run(self) -> CompensationReport {
        let mut report = CompensationReport::default();

        for (step, action) in self.steps.into_iter().rev() {
            match action().await {
                Ok(()) => {
                    tracing::info!(step = %step, "↩️ Compensação executada");
                    report.executed.push(step);
                }
                Err(error) => {
                    tracing::error!(step = %step, error = %error, "🔥 Falha ao compensar");
                    report.failures.push(CompensationFailure { step, error });
                }
            }
        }

        report
    }

    /// Desfaz os passos registrados e devolve o erro original.
    pub async fn rollback(self, primary: AppError) -> AppError {
        if self.is_empty() {
            tracing::warn!(error = %primary, "Operação falhou; nada a compensar");
            return primary;
        }
        tracing::warn!(
            error = %primary,
            steps = self.len(),
            "Operação falhou, iniciando compensação"
        );
        let report = self.run().await;
        if !report.is_clean() {
            tracing::error!(
                failures = report.failures.len(),
                "Compensação incompleta; registros locais podem ter ficado órfãos"
            );
        }
        primary
    }
}
