//! 计算过程中的非致命诊断信息.
//!
//! 数值变换 (如 z-score) 的结果中出现非有限值并不是错误,
//! 但需要告知调用方. 核心函数不直接打印警告, 而是返回 [`Diagnostics`],
//! 或将其交给调用方提供的 [`DiagnosticSink`].

use std::ops::{Add, AddAssign};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 诊断记录.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Diagnostics {
    /// 结果中非有限值 (`NaN`, `±inf`) 的个数.
    pub non_finite: usize,
}

impl Diagnostics {
    /// 统计 `values` 中的非有限值.
    pub fn count_non_finite<'a, I: IntoIterator<Item = &'a f64>>(values: I) -> Self {
        Self {
            non_finite: values.into_iter().filter(|v| !v.is_finite()).count(),
        }
    }

    /// 是否没有任何需要报告的内容?
    #[inline]
    pub fn is_clean(&self) -> bool {
        self.non_finite == 0
    }
}

impl AddAssign for Diagnostics {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.non_finite += rhs.non_finite;
    }
}

impl Add for Diagnostics {
    type Output = Self;

    #[inline]
    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

/// 诊断信息的接收方.
///
/// `context` 为产生诊断信息的操作名, 如 `"normalize"`.
/// 只有非空的诊断记录才会交给接收方.
pub trait DiagnosticSink {
    /// 接收一条诊断记录.
    fn report(&mut self, context: &'static str, diagnostics: &Diagnostics);
}

/// 通过 `log::warn!` 输出诊断信息.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn report(&mut self, context: &'static str, diagnostics: &Diagnostics) {
        log::warn!(
            "{context}: {} non-finite value(s) in result",
            diagnostics.non_finite
        );
    }
}

/// 丢弃所有诊断信息.
#[derive(Copy, Clone, Debug, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    #[inline]
    fn report(&mut self, _: &'static str, _: &Diagnostics) {}
}

/// 累加收到的所有诊断信息.
impl DiagnosticSink for Diagnostics {
    #[inline]
    fn report(&mut self, _: &'static str, diagnostics: &Diagnostics) {
        *self += *diagnostics;
    }
}

impl<F: FnMut(&'static str, &Diagnostics)> DiagnosticSink for F {
    #[inline]
    fn report(&mut self, context: &'static str, diagnostics: &Diagnostics) {
        self(context, diagnostics)
    }
}

/// 若 `diagnostics` 非空, 交给 `sink`.
#[inline]
pub(crate) fn emit<S: DiagnosticSink + ?Sized>(
    sink: &mut S,
    context: &'static str,
    diagnostics: &Diagnostics,
) {
    if !diagnostics.is_clean() {
        sink.report(context, diagnostics);
    }
}
