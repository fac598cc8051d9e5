use syncer_config::{PopulationRules, RuleEntry};
use syncer_domain::{PopulationRule, RuleId};

/// 配置中的人员范围转为规则列表：直接指定的人员、组成员、组成员的联系人
pub(crate) fn rules_from_config<F>(rules: &PopulationRules, rule_id: F) -> Vec<PopulationRule>
where
    F: Fn(&RuleEntry) -> RuleId,
{
    let persons = rules
        .persons
        .iter()
        .map(|entry| PopulationRule::person(rule_id(entry), entry.id));
    let groups = rules
        .groups
        .iter()
        .map(|entry| PopulationRule::group(rule_id(entry), entry.id));
    let correspondence = rules
        .correspondence_groups
        .iter()
        .map(|entry| PopulationRule::correspondence(rule_id(entry), entry.id));

    persons.chain(groups).chain(correspondence).collect()
}
