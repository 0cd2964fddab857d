use rand::seq::SliceRandom;
use rand::Rng;
use rustc_hash::FxHashMap;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::warning::{LoadWarning, Loaded};

/// Returned by [`EntityPool::pick_entity`] when every category is empty.
pub const UNKNOWN_ENTITY: &str = "某人";

/// The built-in category left empty for user additions.
pub const CUSTOM_CATEGORY: &str = "自定义角色";

const BUILTIN_POOL: &[(&str, &[&str])] = &[
    (
        "动漫角色",
        &[
            "远坂凛", "saber", "亚丝娜", "楪祈", "御坂美琴", "炮姐", "时崎狂三", "五河琴里",
            "夜刀神十香", "四糸乃", "八舞耶俱矢", "八舞夕弦", "诱宵美九", "或守鞠亚", "园神凛祢",
            "非莉娅", "两仪式", "浅上藤乃", "黑桐鲜花", "苍崎青子", "久远寺有珠", "卡莲", "尤菲",
            "C.C.", "夏莉", "罗伊德", "柯内莉娅",
        ],
    ),
    (
        "游戏角色",
        &[
            "希尔薇", "莫妮卡", "星梨花", "艾莉卡", "千早", "亚里沙", "真白", "伊莉雅", "美游",
            "小黑", "克洛伊", "巴泽特", "斯卡哈", "斯卡蒂", "布伦希尔德", "齐格飞", "齐格鲁德",
            "源赖光", "酒吞童子", "茨木童子", "玉藻前", "清姬", "阎魔刀",
        ],
    ),
    (
        "原创角色",
        &[
            "苏沐沐", "林若曦", "慕容雪", "欧阳娜娜", "上官婉儿", "司马嫣然", "夏雨荷", "魏紫嫣",
            "秦雨瑶", "唐婉儿", "宋佳音", "许清歌", "韩雪莉", "冯雨晴", "邓紫琪", "曹颖", "萧薰儿",
            "彩鳞", "云韵", "美杜莎", "雅妃", "纳兰嫣然", "云芝", "小医仙",
        ],
    ),
    (
        "通用称呼",
        &[
            "学姐", "学妹", "老师", "护士", "医生", "警察", "空姐", "女仆", "兔女郎", "巫女",
            "修女", "骑士", "法师", "牧师", "刺客", "弓箭手", "舞娘", "歌姬", "偶像", "主播",
        ],
    ),
    (CUSTOM_CATEGORY, &[]),
];

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What to do with a pool file that exists but does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryPolicy {
    /// Copy the broken file to `<file>.bak`, then write the default pool.
    #[default]
    Backup,
    /// Write the default pool over the broken file.
    Overwrite,
}

/// Category → ordered, distinct entity names.
///
/// Categories keep insertion order; that order is also the key order of
/// the persisted JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityPool {
    order: Vec<String>,
    members: FxHashMap<String, Vec<String>>,
}

impl EntityPool {
    /// An empty pool with no categories.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in default pool.
    pub fn builtin() -> Self {
        let mut pool = Self::new();
        for (category, names) in BUILTIN_POOL {
            pool.ensure_category(category);
            for name in *names {
                pool.insert(category, name);
            }
        }
        pool
    }

    /// Create `category` if it does not exist yet.
    pub fn ensure_category(&mut self, category: &str) {
        if !self.members.contains_key(category) {
            self.order.push(category.to_string());
            self.members.insert(category.to_string(), Vec::new());
        }
    }

    /// Add `name` to `category`, creating the category if needed.
    ///
    /// Returns `false` when the name is blank or already present.
    pub fn insert(&mut self, category: &str, name: &str) -> bool {
        if name.trim().is_empty() {
            return false;
        }
        self.ensure_category(category);
        let Some(names) = self.members.get_mut(category) else {
            return false;
        };
        if names.iter().any(|existing| existing == name) {
            return false;
        }
        names.push(name.to_string());
        true
    }

    /// Merge `other` into this pool. Known categories gain the names they
    /// lack, in `other`'s order; unknown categories are appended.
    pub fn merge(&mut self, other: EntityPool) {
        let EntityPool { order, mut members } = other;
        for category in order {
            self.ensure_category(&category);
            for name in members.remove(&category).unwrap_or_default() {
                self.insert(&category, &name);
            }
        }
    }

    pub fn names(&self, category: &str) -> &[String] {
        self.members.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, category: &str, name: &str) -> bool {
        self.names(category).iter().any(|existing| existing == name)
    }

    /// Categories with their names, in order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.order
            .iter()
            .map(move |name| (name.as_str(), self.names(name)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn entity_count(&self) -> usize {
        self.members.values().map(Vec::len).sum()
    }

    /// Pick a category uniformly among the non-empty ones, then a name
    /// uniformly within it. Names in small categories are therefore drawn
    /// more often than names in large ones.
    pub fn pick_entity<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        let available: Vec<&[String]> = self
            .categories()
            .map(|(_, names)| names)
            .filter(|names| !names.is_empty())
            .collect();
        available
            .choose(rng)
            .copied()
            .and_then(|names| names.choose(rng))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_ENTITY)
    }

    /// Parse a JSON object of category → list of names.
    pub fn from_json_str(input: &str) -> Result<EntityPool, serde_json::Error> {
        serde_json::from_str(input)
    }

    /// Load the pool file at `path`, merged over the built-in defaults.
    ///
    /// A missing file is created with the defaults. A malformed file is
    /// handled per `policy`. Neither case is an error.
    pub fn load(path: &Path, policy: RecoveryPolicy) -> Loaded<EntityPool> {
        let mut pool = EntityPool::builtin();

        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return match pool.save(path) {
                    Ok(()) => {
                        tracing::info!(path = %path.display(), "created default entity pool file");
                        Loaded::clean(pool)
                    }
                    Err(e) => Loaded::with_warning(
                        pool,
                        LoadWarning::PoolNotPersisted {
                            path: path.to_path_buf(),
                            message: e.to_string(),
                        },
                    ),
                };
            }
            Err(source) => {
                return Loaded::with_warning(
                    pool,
                    LoadWarning::PoolUnreadable {
                        path: path.to_path_buf(),
                        source,
                    },
                );
            }
        };

        let source = match EntityPool::from_json_str(&contents) {
            Ok(custom) => {
                pool.merge(custom);
                tracing::debug!(
                    path = %path.display(),
                    categories = pool.len(),
                    entities = pool.entity_count(),
                    "loaded entity pool"
                );
                return Loaded::clean(pool);
            }
            Err(source) => source,
        };

        let backup = match policy {
            RecoveryPolicy::Backup => {
                let backup = backup_path(path);
                if let Err(e) = fs::copy(path, &backup) {
                    // Without a backup the broken file stays where it is.
                    let mut loaded = Loaded::with_warning(
                        pool,
                        LoadWarning::PoolMalformed {
                            path: path.to_path_buf(),
                            backup: None,
                            source,
                        },
                    );
                    let warning = LoadWarning::PoolNotPersisted {
                        path: path.to_path_buf(),
                        message: format!("backup to {} failed: {}", backup.display(), e),
                    };
                    tracing::warn!("{}", warning);
                    loaded.warnings.push(warning);
                    return loaded;
                }
                tracing::info!(backup = %backup.display(), "backed up malformed entity pool file");
                Some(backup)
            }
            RecoveryPolicy::Overwrite => None,
        };

        let mut loaded = Loaded::with_warning(
            pool,
            LoadWarning::PoolMalformed {
                path: path.to_path_buf(),
                backup,
                source,
            },
        );
        if let Err(e) = loaded.value.save(path) {
            let warning = LoadWarning::PoolNotPersisted {
                path: path.to_path_buf(),
                message: e.to_string(),
            };
            tracing::warn!("{}", warning);
            loaded.warnings.push(warning);
        }
        loaded
    }

    /// Write the pool as pretty-printed JSON, categories in pool order.
    pub fn save(&self, path: &Path) -> Result<(), PoolError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }
}

/// `characters.json` → `characters.json.bak`, next to the original.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| OsString::from("pool"));
    name.push(".bak");
    path.with_file_name(name)
}

impl Serialize for EntityPool {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.order.len()))?;
        for (category, names) in self.categories() {
            map.serialize_entry(category, names)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for EntityPool {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(PoolVisitor)
    }
}

struct PoolVisitor;

impl<'de> Visitor<'de> for PoolVisitor {
    type Value = EntityPool;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("an object mapping category names to lists of entity names")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<EntityPool, A::Error> {
        let mut pool = EntityPool::new();
        while let Some((category, names)) = access.next_entry::<String, Option<Vec<String>>>()? {
            pool.ensure_category(&category);
            for name in names.unwrap_or_default() {
                pool.insert(&category, &name);
            }
        }
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn builtin_has_five_categories_with_empty_custom() {
        let pool = EntityPool::builtin();
        let names: Vec<&str> = pool.categories().map(|(c, _)| c).collect();
        assert_eq!(names, vec!["动漫角色", "游戏角色", "原创角色", "通用称呼", CUSTOM_CATEGORY]);
        assert!(pool.names(CUSTOM_CATEGORY).is_empty());
        assert_eq!(pool.names("动漫角色")[0], "远坂凛");
    }

    #[test]
    fn merge_appends_only_new_names() {
        let mut pool = EntityPool::builtin();
        let before = pool.names("通用称呼").len();
        let custom = EntityPool::from_json_str(r#"{"通用称呼": ["学姐", "店长", "店长"]}"#).unwrap();
        pool.merge(custom);
        let names = pool.names("通用称呼");
        assert_eq!(names.len(), before + 1);
        assert_eq!(names.last().map(String::as_str), Some("店长"));
        assert_eq!(names[0], "学姐");
    }

    #[test]
    fn merge_adds_unknown_categories_at_the_end() {
        let mut pool = EntityPool::builtin();
        let custom = EntityPool::from_json_str(r#"{"乐队": ["主唱", "鼓手"], "自定义角色": ["X"]}"#).unwrap();
        pool.merge(custom);
        let order: Vec<&str> = pool.categories().map(|(c, _)| c).collect();
        assert_eq!(order.last(), Some(&"乐队"));
        assert_eq!(pool.names("乐队"), ["主唱".to_string(), "鼓手".to_string()]);
        assert_eq!(pool.names(CUSTOM_CATEGORY), ["X".to_string()]);
    }

    #[test]
    fn name_matching_is_case_sensitive() {
        let mut pool = EntityPool::builtin();
        assert!(pool.insert("动漫角色", "Saber"));
        assert!(!pool.insert("动漫角色", "saber"));
    }

    #[test]
    fn null_lists_read_as_empty() {
        let pool = EntityPool::from_json_str(r#"{"乐队": null}"#).unwrap();
        assert!(pool.names("乐队").is_empty());
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn non_object_json_is_rejected() {
        assert!(EntityPool::from_json_str(r#"["a", "b"]"#).is_err());
        assert!(EntityPool::from_json_str(r#"{"a": "b"}"#).is_err());
    }

    #[test]
    fn insert_twice_keeps_one() {
        let mut pool = EntityPool::new();
        assert!(pool.insert("新分类", "A"));
        assert!(!pool.insert("新分类", "A"));
        assert_eq!(pool.names("新分类"), ["A".to_string()]);
        assert!(!pool.insert("新分类", "   "));
    }

    #[test]
    fn blank_insert_does_not_create_category() {
        let mut pool = EntityPool::new();
        assert!(!pool.insert("空分类", "  "));
        assert!(pool.is_empty());
        assert!(!pool.categories().any(|(c, _)| c == "空分类"));
    }

    #[test]
    fn builtin_category_sizes() {
        let pool = EntityPool::builtin();
        let sizes: Vec<(&str, usize)> = pool.categories().map(|(c, n)| (c, n.len())).collect();
        assert_eq!(
            sizes,
            vec![
                ("动漫角色", 27),
                ("游戏角色", 23),
                ("原创角色", 24),
                ("通用称呼", 20),
                (CUSTOM_CATEGORY, 0),
            ]
        );
        assert_eq!(pool.names("动漫角色").last().map(String::as_str), Some("柯内莉娅"));
        assert_eq!(pool.names("游戏角色").last().map(String::as_str), Some("阎魔刀"));
        assert_eq!(pool.names("原创角色").last().map(String::as_str), Some("小医仙"));
        assert_eq!(pool.names("通用称呼")[8], "兔女郎");
    }

    #[test]
    fn serialization_keeps_category_order() {
        let mut pool = EntityPool::new();
        pool.insert("乙", "b");
        pool.insert("甲", "a");
        let json = serde_json::to_string(&pool).unwrap();
        assert_eq!(json, r#"{"乙":["b"],"甲":["a"]}"#);
    }

    #[test]
    fn pick_entity_skips_empty_categories() {
        let mut pool = EntityPool::new();
        pool.ensure_category("空");
        pool.insert("满", "唯一");
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            assert_eq!(pool.pick_entity(&mut rng), "唯一");
        }
    }

    #[test]
    fn pick_entity_from_empty_pool_is_sentinel() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(EntityPool::new().pick_entity(&mut rng), UNKNOWN_ENTITY);
        assert_eq!(EntityPool::builtin().names(CUSTOM_CATEGORY).len(), 0);
    }

    #[test]
    fn pick_entity_is_uniform_over_categories_first() {
        let mut pool = EntityPool::new();
        pool.insert("small", "lonely");
        for i in 0..9 {
            pool.insert("large", &format!("crowd{}", i));
        }
        let mut rng = StdRng::seed_from_u64(99);
        let draws = 4000;
        let lonely = (0..draws)
            .filter(|_| pool.pick_entity(&mut rng) == "lonely")
            .count();
        // Two-stage choice gives ~50%; a flat choice would give ~10%.
        let share = lonely as f64 / draws as f64;
        assert!((0.44..0.56).contains(&share), "share was {}", share);
    }

    #[test]
    fn backup_path_appends_suffix() {
        assert_eq!(
            backup_path(Path::new("data/characters.json")),
            PathBuf::from("data/characters.json.bak")
        );
    }

    #[test]
    fn load_missing_file_creates_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("characters.json");
        let loaded = EntityPool::load(&path, RecoveryPolicy::Backup);
        assert!(loaded.warnings.is_empty());
        assert_eq!(loaded.value, EntityPool::builtin());
        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(EntityPool::from_json_str(&written).unwrap(), EntityPool::builtin());
        assert!(written.contains("\n  \"动漫角色\": [\n"));
    }

    #[test]
    fn load_malformed_file_backs_up_and_rewrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("characters.json");
        fs::write(&path, "{ not json").unwrap();

        let loaded = EntityPool::load(&path, RecoveryPolicy::Backup);
        assert_eq!(loaded.value, EntityPool::builtin());
        assert!(matches!(
            &loaded.warnings[0],
            LoadWarning::PoolMalformed { backup: Some(_), .. }
        ));
        assert_eq!(fs::read_to_string(backup_path(&path)).unwrap(), "{ not json");
        let rewritten = fs::read_to_string(&path).unwrap();
        assert!(EntityPool::from_json_str(&rewritten).is_ok());
    }

    #[test]
    fn load_malformed_file_overwrite_policy_leaves_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("characters.json");
        fs::write(&path, "[1, 2").unwrap();

        let loaded = EntityPool::load(&path, RecoveryPolicy::Overwrite);
        assert!(matches!(
            &loaded.warnings[0],
            LoadWarning::PoolMalformed { backup: None, .. }
        ));
        assert!(!backup_path(&path).exists());
        assert_eq!(
            EntityPool::from_json_str(&fs::read_to_string(&path).unwrap()).unwrap(),
            EntityPool::builtin()
        );
    }

    #[test]
    fn custom_entry_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("characters.json");
        fs::write(&path, r#"{"自定义角色": ["X"]}"#).unwrap();

        let first = EntityPool::load(&path, RecoveryPolicy::Backup).value;
        assert_eq!(first.names(CUSTOM_CATEGORY), ["X".to_string()]);

        first.save(&path).unwrap();
        let second = EntityPool::load(&path, RecoveryPolicy::Backup).value;
        assert_eq!(first, second);
    }
}
