//! 人员范围展开
//!
//! 规则按声明顺序求值，同一规则内保持数据源返回的顺序。结果按
//! `(规则, 人员)` 去重：同一人员可以出现在多条规则下，统计人数时再按人员去重。

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use syncer_core::{GroupId, PersonId, SourceDirectory, SyncResult};
use tracing::debug;

/// 规则标识，同一标识下的人员只保留一次
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId(String);

impl RuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleSource {
    /// 直接指定的人员
    Person(PersonId),
    /// 组的全部成员
    Group(GroupId),
    /// 组成员的联系人（两跳）
    Correspondence(GroupId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulationRule {
    pub id: RuleId,
    pub source: RuleSource,
}

impl PopulationRule {
    pub fn person(id: RuleId, person_id: PersonId) -> Self {
        Self {
            id,
            source: RuleSource::Person(person_id),
        }
    }

    pub fn group(id: RuleId, group_id: GroupId) -> Self {
        Self {
            id,
            source: RuleSource::Group(group_id),
        }
    }

    pub fn correspondence(id: RuleId, group_id: GroupId) -> Self {
        Self {
            id,
            source: RuleSource::Correspondence(group_id),
        }
    }
}

/// 人员入选的原因
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selector {
    pub rule: RuleId,
    pub person_id: PersonId,
}

/// 一次运行的目标人员集合
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Population {
    selectors: Vec<Selector>,
    seen: HashSet<(RuleId, PersonId)>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已存在相同 `(规则, 人员)` 时返回 false
    pub fn insert(&mut self, rule: &RuleId, person_id: PersonId) -> bool {
        if !self.seen.insert((rule.clone(), person_id)) {
            return false;
        }
        self.selectors.push(Selector {
            rule: rule.clone(),
            person_id,
        });
        true
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.selectors
    }

    pub fn len(&self) -> usize {
        self.selectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selectors.is_empty()
    }

    /// 按首次出现顺序去重后的人员
    pub fn person_ids(&self) -> Vec<PersonId> {
        let mut seen = HashSet::new();
        self.selectors
            .iter()
            .map(|selector| selector.person_id)
            .filter(|person_id| seen.insert(*person_id))
            .collect()
    }

    pub fn distinct_person_count(&self) -> usize {
        self.selectors
            .iter()
            .map(|selector| selector.person_id)
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Selector> {
        self.selectors.iter()
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a Selector;
    type IntoIter = std::slice::Iter<'a, Selector>;

    fn into_iter(self) -> Self::IntoIter {
        self.selectors.iter()
    }
}

/// 展开人员范围
///
/// 数据源调用失败时整体返回错误，不产生部分结果。
pub async fn accumulate<S>(rules: &[PopulationRule], source: &S) -> SyncResult<Population>
where
    S: SourceDirectory + ?Sized,
{
    let mut population = Population::new();

    for rule in rules {
        let before = population.len();
        match rule.source {
            RuleSource::Person(person_id) => {
                population.insert(&rule.id, person_id);
            }
            RuleSource::Group(group_id) => {
                for membership in source.list_group_members(group_id).await? {
                    population.insert(&rule.id, membership.person_id);
                }
            }
            RuleSource::Correspondence(group_id) => {
                for membership in source.list_group_members(group_id).await? {
                    for correspondent in source.list_correspondents(membership.person_id).await? {
                        population.insert(&rule.id, correspondent);
                    }
                }
            }
        }
        debug!(
            "规则 {} ({:?}) 新增 {} 人",
            rule.id,
            rule.source,
            population.len() - before
        );
    }

    Ok(population)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_deduplicates_by_rule_and_person() {
        let private = RuleId::new("private");
        let work = RuleId::new("work");
        let mut population = Population::new();

        assert!(population.insert(&private, 1));
        assert!(!population.insert(&private, 1));
        assert!(population.insert(&work, 1));
        assert!(population.insert(&private, 2));

        assert_eq!(population.len(), 3);
        assert_eq!(population.distinct_person_count(), 2);
        assert_eq!(population.person_ids(), vec![1, 2]);
    }
}
