//! Tree rewriting.
//!
//! Rules are closures from a node to `Some(replacement)`, or `None` to leave
//! the node alone. Untouched subtrees are shared with the input by clone, and
//! every replacement inherits the tags of the node it replaced unless the
//! rule attached its own.

use tracing::trace;

use super::node::LogicalPlan;
use super::patterns::TreePatternBits;
use crate::error::PlanResult;
use crate::expr::Expr;

type Rule<'a> = dyn FnMut(&LogicalPlan) -> Option<LogicalPlan> + 'a;

impl LogicalPlan {
    /// Applies `rule` to every node, children first.
    ///
    /// # Errors
    ///
    /// Returns an error if a rule produces a node that cannot take the
    /// rewritten children of the node it replaced.
    pub fn transform_up(&self, rule: &mut Rule<'_>) -> PlanResult<LogicalPlan> {
        self.transform_up_with_pruning(&|_| true, rule)
    }

    /// Like [`LogicalPlan::transform_up`], skipping every subtree whose tree
    /// patterns fail `cond`.
    ///
    /// # Errors
    ///
    /// See [`LogicalPlan::transform_up`].
    pub fn transform_up_with_pruning(
        &self,
        cond: &dyn Fn(TreePatternBits) -> bool,
        rule: &mut Rule<'_>,
    ) -> PlanResult<LogicalPlan> {
        Ok(self.rewrite_up(cond, rule)?.unwrap_or_else(|| self.clone()))
    }

    /// Applies `rule` to every node, parents first. The children of a
    /// replacement are visited, not the children of the replaced node.
    ///
    /// # Errors
    ///
    /// See [`LogicalPlan::transform_up`].
    pub fn transform_down(&self, rule: &mut Rule<'_>) -> PlanResult<LogicalPlan> {
        self.transform_down_with_pruning(&|_| true, rule)
    }

    /// Like [`LogicalPlan::transform_down`], skipping every subtree whose
    /// tree patterns fail `cond`.
    ///
    /// # Errors
    ///
    /// See [`LogicalPlan::transform_up`].
    pub fn transform_down_with_pruning(
        &self,
        cond: &dyn Fn(TreePatternBits) -> bool,
        rule: &mut Rule<'_>,
    ) -> PlanResult<LogicalPlan> {
        Ok(self.rewrite_down(cond, rule)?.unwrap_or_else(|| self.clone()))
    }

    /// Applies `rule` bottom-up to every expression of every node.
    ///
    /// # Errors
    ///
    /// See [`LogicalPlan::transform_up`].
    pub fn transform_expressions(&self, rule: &mut dyn FnMut(Expr) -> Expr) -> PlanResult<LogicalPlan> {
        self.transform_up(&mut |node| {
            let mapped = node.map_expressions(&mut |e| e.transform_up(&mut *rule));
            (mapped != *node).then_some(mapped)
        })
    }

    /// Returns the first node, in pre-order, that satisfies `pred`.
    pub fn find(&self, pred: &dyn Fn(&LogicalPlan) -> bool) -> Option<&LogicalPlan> {
        if pred(self) {
            return Some(self);
        }
        self.children().into_iter().find_map(|c| c.find(pred))
    }

    /// Returns true if any node satisfies `pred`.
    pub fn exists(&self, pred: &dyn Fn(&LogicalPlan) -> bool) -> bool {
        self.find(pred).is_some()
    }

    fn rewrite_up(
        &self,
        cond: &dyn Fn(TreePatternBits) -> bool,
        rule: &mut Rule<'_>,
    ) -> PlanResult<Option<LogicalPlan>> {
        if !cond(self.tree_patterns()) {
            return Ok(None);
        }
        let rebuilt = self.rewrite_children(&mut |c| c.rewrite_up(cond, &mut *rule))?;
        let current = rebuilt.as_ref().unwrap_or(self);
        match rule(current) {
            Some(mut replacement) => {
                trace!(from = current.node_name(), to = replacement.node_name(), "rule applied bottom-up");
                replacement.copy_tags_from(current);
                Ok(Some(replacement))
            }
            None => Ok(rebuilt),
        }
    }

    fn rewrite_down(
        &self,
        cond: &dyn Fn(TreePatternBits) -> bool,
        rule: &mut Rule<'_>,
    ) -> PlanResult<Option<LogicalPlan>> {
        if !cond(self.tree_patterns()) {
            return Ok(None);
        }
        let applied = rule(self).map(|mut replacement| {
            trace!(from = self.node_name(), to = replacement.node_name(), "rule applied top-down");
            replacement.copy_tags_from(self);
            replacement
        });
        let current = applied.as_ref().unwrap_or(self);
        let rebuilt = current.rewrite_children(&mut |c| c.rewrite_down(cond, &mut *rule))?;
        Ok(rebuilt.or(applied))
    }

    /// Rebuilds this node if `f` changed any child.
    fn rewrite_children(
        &self,
        f: &mut dyn FnMut(&LogicalPlan) -> PlanResult<Option<LogicalPlan>>,
    ) -> PlanResult<Option<LogicalPlan>> {
        let children = self.children();
        let mut changed = false;
        let mut new_children = Vec::with_capacity(children.len());
        for child in children {
            match f(child)? {
                Some(c) => {
                    changed = true;
                    new_children.push(c);
                }
                None => new_children.push(child.clone()),
            }
        }
        if !changed {
            return Ok(None);
        }
        self.with_new_children(new_children).map(Some)
    }
}
