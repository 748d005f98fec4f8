//! Flattened view of every checkable field in a pack, with JSON paths

use std::collections::HashMap;

use packforge_domain::{
    AchievementReward, Condition, ContentId, ContentKind, LocalizedText, NumericFormula,
    PackModules, TransformTrigger, UpgradeEffect, UpgradeTarget,
};

const RESOURCE: &[ContentKind] = &[ContentKind::Resource];
const GENERATOR: &[ContentKind] = &[ContentKind::Generator];
const RESETTABLE: &[ContentKind] = &[ContentKind::Resource, ContentKind::Generator];

/// Where each parsed entity sat in its module array. Entries that failed to
/// parse are skipped, so parsed and source positions can differ.
#[derive(Debug, Default)]
pub(crate) struct SourcePositions {
    positions: HashMap<ContentKind, Vec<usize>>,
}

impl SourcePositions {
    pub fn record(&mut self, kind: ContentKind, positions: Vec<usize>) {
        self.positions.insert(kind, positions);
    }

    /// `module[i]` using the source index of the `parsed`-th entity
    pub fn path(&self, kind: ContentKind, parsed: usize) -> String {
        let index = self
            .positions
            .get(&kind)
            .and_then(|positions| positions.get(parsed))
            .copied()
            .unwrap_or(parsed);
        format!("{}[{}]", kind.module_name(), index)
    }
}

/// A direct id field that must resolve to one of `expected`
#[derive(Debug)]
pub(crate) struct FieldRef<'a> {
    pub path: String,
    pub expected: &'static [ContentKind],
    pub id: &'a ContentId,
}

#[derive(Debug, Default)]
pub(crate) struct PackFields<'a> {
    pub conditions: Vec<(String, &'a Condition)>,
    pub formulas: Vec<(String, &'a NumericFormula)>,
    pub refs: Vec<FieldRef<'a>>,
    pub texts: Vec<(String, &'a LocalizedText)>,
}

impl<'a> PackFields<'a> {
    fn condition(&mut self, path: String, condition: &'a Condition) {
        self.conditions.push((path, condition));
    }

    fn opt_condition(&mut self, path: impl FnOnce() -> String, condition: &'a Option<Condition>) {
        if let Some(condition) = condition {
            self.conditions.push((path(), condition));
        }
    }

    fn formula(&mut self, path: String, formula: &'a NumericFormula) {
        self.formulas.push((path, formula));
    }

    fn reference(&mut self, path: String, expected: &'static [ContentKind], id: &'a ContentId) {
        self.refs.push(FieldRef { path, expected, id });
    }

    fn text(&mut self, path: String, text: &'a LocalizedText) {
        self.texts.push((path, text));
    }
}

/// Collect every condition, formula, id reference and display text in `modules`.
pub(crate) fn collect_fields<'a>(
    modules: &'a PackModules,
    source: &SourcePositions,
) -> PackFields<'a> {
    let mut fields = PackFields::default();

    for (i, resource) in modules.resources.iter().enumerate() {
        let base = source.path(ContentKind::Resource, i);
        fields.text(format!("{}.name", base), &resource.name);
        fields.opt_condition(|| format!("{}.unlockCondition", base), &resource.unlock_condition);
        fields.opt_condition(
            || format!("{}.visibilityCondition", base),
            &resource.visibility_condition,
        );
    }

    for (i, generator) in modules.generators.iter().enumerate() {
        let base = source.path(ContentKind::Generator, i);
        fields.text(format!("{}.name", base), &generator.name);
        for (j, rate) in generator.produces.iter().enumerate() {
            let path = format!("{}.produces[{}]", base, j);
            fields.reference(format!("{}.resourceId", path), RESOURCE, &rate.resource_id);
            fields.formula(format!("{}.rate", path), &rate.rate);
        }
        for (j, rate) in generator.consumes.iter().enumerate() {
            let path = format!("{}.consumes[{}]", base, j);
            fields.reference(format!("{}.resourceId", path), RESOURCE, &rate.resource_id);
            fields.formula(format!("{}.rate", path), &rate.rate);
        }
        fields.reference(
            format!("{}.purchase.currencyId", base),
            RESOURCE,
            &generator.purchase.currency_id,
        );
        fields.formula(
            format!("{}.purchase.costCurve", base),
            &generator.purchase.cost_curve,
        );
        fields.condition(format!("{}.baseUnlock", base), &generator.base_unlock);
        fields.opt_condition(
            || format!("{}.visibilityCondition", base),
            &generator.visibility_condition,
        );
    }

    for (i, upgrade) in modules.upgrades.iter().enumerate() {
        let base = source.path(ContentKind::Upgrade, i);
        fields.text(format!("{}.name", base), &upgrade.name);
        for (j, target) in upgrade.targets.iter().enumerate() {
            let path = format!("{}.targets[{}].id", base, j);
            match target {
                UpgradeTarget::Resource { id } => fields.reference(path, RESOURCE, id),
                UpgradeTarget::Generator { id } => fields.reference(path, GENERATOR, id),
                UpgradeTarget::Global => {}
            }
        }
        fields.reference(
            format!("{}.cost.currencyId", base),
            RESOURCE,
            &upgrade.cost.currency_id,
        );
        fields.formula(format!("{}.cost.costCurve", base), &upgrade.cost.cost_curve);
        if let Some(curve) = upgrade
            .repeatable
            .as_ref()
            .and_then(|r| r.cost_curve.as_ref())
        {
            fields.formula(format!("{}.repeatable.costCurve", base), curve);
        }
        for (j, prerequisite) in upgrade.prerequisites.iter().enumerate() {
            fields.condition(format!("{}.prerequisites[{}]", base, j), prerequisite);
        }
        for (j, effect) in upgrade.effects.iter().enumerate() {
            let path = format!("{}.effects[{}]", base, j);
            match effect {
                UpgradeEffect::ModifyResourceRate { resource_id, .. }
                | UpgradeEffect::UnlockResource { resource_id } => {
                    fields.reference(format!("{}.resourceId", path), RESOURCE, resource_id)
                }
                UpgradeEffect::ModifyGeneratorRate { generator_id, .. }
                | UpgradeEffect::ModifyGeneratorCost { generator_id, .. }
                | UpgradeEffect::UnlockGenerator { generator_id } => {
                    fields.reference(format!("{}.generatorId", path), GENERATOR, generator_id)
                }
                UpgradeEffect::GrantFlag { .. } => {}
            }
            if let Some(value) = effect.value() {
                fields.formula(format!("{}.value", path), value);
            }
        }
        fields.opt_condition(|| format!("{}.unlockCondition", base), &upgrade.unlock_condition);
        fields.opt_condition(
            || format!("{}.visibilityCondition", base),
            &upgrade.visibility_condition,
        );
    }

    for (i, transform) in modules.transforms.iter().enumerate() {
        let base = source.path(ContentKind::Transform, i);
        fields.text(format!("{}.name", base), &transform.name);
        for (side, endpoints) in [("inputs", &transform.inputs), ("outputs", &transform.outputs)] {
            for (j, endpoint) in endpoints.iter().enumerate() {
                let path = format!("{}.{}[{}]", base, side, j);
                fields.reference(
                    format!("{}.resourceId", path),
                    RESOURCE,
                    &endpoint.resource_id,
                );
                fields.formula(format!("{}.amount", path), &endpoint.amount);
            }
        }
        if let TransformTrigger::Condition { condition } = &transform.trigger {
            fields.condition(format!("{}.trigger.condition", base), condition);
        }
        if let Some(cooldown) = &transform.cooldown {
            fields.formula(format!("{}.cooldown", base), cooldown);
        }
        fields.opt_condition(
            || format!("{}.unlockCondition", base),
            &transform.unlock_condition,
        );
        fields.opt_condition(
            || format!("{}.visibilityCondition", base),
            &transform.visibility_condition,
        );
    }

    for (i, achievement) in modules.achievements.iter().enumerate() {
        let base = source.path(ContentKind::Achievement, i);
        fields.text(format!("{}.name", base), &achievement.name);
        if let Some(description) = &achievement.description {
            fields.text(format!("{}.description", base), description);
        }
        fields.condition(format!("{}.track", base), &achievement.track);
        fields.opt_condition(
            || format!("{}.unlockCondition", base),
            &achievement.unlock_condition,
        );
        if let Some(AchievementReward::GrantResource {
            resource_id,
            amount,
        }) = &achievement.reward
        {
            fields.reference(format!("{}.reward.resourceId", base), RESOURCE, resource_id);
            fields.formula(format!("{}.reward.amount", base), amount);
        }
    }

    for (i, layer) in modules.prestige_layers.iter().enumerate() {
        let base = source.path(ContentKind::PrestigeLayer, i);
        fields.text(format!("{}.name", base), &layer.name);
        if let Some(summary) = &layer.summary {
            fields.text(format!("{}.summary", base), summary);
        }
        for (j, target) in layer.reset_targets.iter().enumerate() {
            fields.reference(format!("{}.resetTargets[{}]", base, j), RESETTABLE, target);
        }
        fields.condition(format!("{}.unlockCondition", base), &layer.unlock_condition);
        fields.reference(
            format!("{}.reward.resourceId", base),
            RESOURCE,
            &layer.reward.resource_id,
        );
        fields.formula(format!("{}.reward.baseReward", base), &layer.reward.base_reward);
        if let Some(curve) = &layer.reward.multiplier_curve {
            fields.formula(format!("{}.reward.multiplierCurve", base), curve);
        }
    }

    fields
}
