//! Hand-authored beat sheets for the two opening episodes.
//!
//! Episodes 1 and 2 carry fixed exposition (world, identity, system,
//! first ally) that does not vary with outline content, so they are
//! written out beat by beat and rendered through the component library.

use crate::schema::marker::Color;
use crate::schema::scene::Placement;

/// One rendered unit of an authored scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Beat {
    /// Plain action line, `△{text}。`
    Action(&'static str),
    /// Color-marked action line.
    Marked(Color, &'static str),
    /// Extra floating location label inside a scene.
    Label(&'static str),
    Line {
        speaker: &'static str,
        cue: Option<&'static str>,
        text: &'static str,
    },
    /// Protagonist's interior monologue.
    Monologue(&'static str),
    Narrator(&'static str),
    System(&'static str),
    Sound(&'static str, &'static str),
    CombatSound(&'static str),
    AmbientSound(&'static str),
    Panel(Color, &'static str),
    Binding(&'static [&'static str]),
    Task {
        name: &'static str,
        description: &'static str,
        reward: &'static str,
        penalty: Option<&'static str>,
    },
    TaskComplete {
        time_used: &'static str,
        reward: &'static str,
    },
    MainQuest {
        description: &'static str,
        progress: &'static str,
        reward: &'static str,
    },
    Warning(&'static str, u8),
    /// First-mention introduction. `identity` is used when the character
    /// sheet has none. Later mentions render only the action.
    Intro {
        name: &'static str,
        action: &'static str,
        identity: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthoredScene {
    pub time: &'static str,
    pub placement: Placement,
    pub location: &'static str,
    pub beats: &'static [Beat],
}

/// A full authored episode split into the four assembly parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthoredEpisode {
    pub roster: &'static [&'static str],
    pub cause: &'static [AuthoredScene],
    pub process: &'static [AuthoredScene],
    pub result: &'static [AuthoredScene],
    pub hook: &'static [AuthoredScene],
}

impl AuthoredEpisode {
    pub fn parts(&self) -> [&'static [AuthoredScene]; 4] {
        [self.cause, self.process, self.result, self.hook]
    }
}

const fn line(speaker: &'static str, text: &'static str) -> Beat {
    Beat::Line {
        speaker,
        cue: None,
        text,
    }
}

const fn cue(speaker: &'static str, cue: &'static str, text: &'static str) -> Beat {
    Beat::Line {
        speaker,
        cue: Some(cue),
        text,
    }
}

const SYSTEM_CHIME: Beat = Beat::Sound("叮", "系统提示音");

pub const FIRST: AuthoredEpisode = AuthoredEpisode {
    roster: &["陆念离", "陆长乐", "刺客首领", "刺客（两名）", "镇北军士兵（数名）"],
    cause: &[
        AuthoredScene {
            time: "夜",
            placement: Placement::Exterior,
            location: "大奉北域成安郡",
            beats: &[
                Beat::Action("俯视图：俗世百朝四方地图，武道兴盛，朝堂江湖危机四伏"),
                Beat::Narrator("这是俗世百朝，武道兴盛，朝堂江湖危机四伏。"),
                Beat::Label("大奉皇朝"),
                Beat::Action("俯视图：大奉皇朝，镇北王府在北，皇宫在南"),
                Beat::Narrator("大奉皇朝，镇北王府镇守北域，皇室忌惮兵权。今日镇北王世子陆念离二十岁生辰，太子暗中派出了刺客。"),
            ],
        },
        AuthoredScene {
            time: "夜",
            placement: Placement::Exterior,
            location: "镇北王府·生辰宴",
            beats: &[
                Beat::Action("夜，镇北王府生辰宴，烛火通明，宾客满座"),
                Beat::Sound("叮当", "酒杯碰撞声"),
                Beat::Intro {
                    name: "陆长乐",
                    action: "站在宴席旁，穿黑色劲装，腰间佩剑",
                    identity: "镇北王长女，镇北军统领",
                },
                Beat::Action("陆念离装醉，脚步踉跄，向陆长乐告别"),
                cue("陆念离", "挥手", "今天我庆生辰，大家吃好喝好！"),
                Beat::Action("陆长乐皱眉，扶住陆念离"),
                cue("陆长乐", "扶住陆念离", "你少喝点，今天别出什么事。"),
                Beat::Monologue("二姐放心，今晚过了就好。"),
            ],
        },
    ],
    process: &[AuthoredScene {
        time: "夜",
        placement: Placement::Interior,
        location: "镇北王府·世子寝殿",
        beats: &[
            Beat::Action("夜，世子寝殿，烛火摇晃，桌案摊着半幅美人图，狼毫笔斜插墨砚"),
            Beat::Action("陆念离关上殿门，脚步一稳，醉意全消"),
            Beat::Monologue("五年前穿越成镇北王世子，摆烂至今，终于解锁了摆烂系统。这一世，我要护住二姐，护住镇北王府。"),
            Beat::Action("陆念离侧躺床上，腰间玉画筒抵着床沿"),
            Beat::Action("三道黑影从后窗翻入，反握寒刃围向床榻"),
            Beat::Intro {
                name: "刺客首领",
                action: "蒙面，穿夜行衣，手持寒刃",
                identity: "太子雇佣的杀手",
            },
            cue("刺客首领", "抬手指向床榻", "太子有令，取陆念离首级！"),
            Beat::Marked(Color::Yellow, "刺客首领挥刀劈向陆念离眉心"),
            Beat::Action("刀距眉心两寸时，陆念离睁眼，翻身踹中刺客首领小腹"),
            Beat::CombatSound("踢中"),
            cue("陆念离", "翻身下床", "朱峰派你们来送死？"),
            Beat::Action("陆念离后背被划开一道口子，血珠顺脊背滑落"),
            Beat::Binding(&["苍生笔", "修罗剑意"]),
            SYSTEM_CHIME,
            Beat::Task {
                name: "新手任务·摆烂反杀",
                description: "十分钟内击杀三名刺客",
                reward: "摆烂值1000点",
                penalty: Some("超时解绑！"),
            },
            Beat::System("新手任务已发布！"),
            Beat::Action("陆念离掌心浮现苍生笔虚影，笔杆刻着画通万物四字"),
            cue("陆念离", "笔尖指向刺客首领", "藏头露尾，也配叫刺客？"),
            Beat::Marked(Color::Green, "苍生笔点出，金色画纹化作三寸剑气，贯穿刺客首领"),
            Beat::Sound("当啷", "寒刃落地声"),
            cue("剩余两名刺客", "左右扑来", "这小子藏了实力，合击！"),
            Beat::Action("苍生笔连点两下，金色画纹化作锁链，缠住两名刺客"),
            cue("陆念离", "收劲", "不堪一击。"),
            Beat::CombatSound("骨折"),
            Beat::TaskComplete {
                time_used: "3分27秒",
                reward: "摆烂值1000点",
            },
            Beat::System("任务完成！摆烂值1000点到账！"),
        ],
    }],
    result: &[AuthoredScene {
        time: "夜",
        placement: Placement::Interior,
        location: "镇北王府·世子寝殿",
        beats: &[
            Beat::Action("殿门被推开，陆长乐率镇北军冲入寝殿"),
            Beat::AmbientSound("开门"),
            Beat::Intro {
                name: "陆长乐",
                action: "看到三具刺客尸体，快步冲到陆念离身前",
                identity: "镇北王长女，镇北军统领",
            },
            cue("陆长乐", "握剑", "谁敢动我弟弟！"),
            line("陆念离", "二姐，我没事。太子派来的刺客，已经被我收拾了。"),
            cue("陆长乐", "握住陆念离的手", "太子敢动你，我定要他付出代价。"),
            line("陆念离", "二姐放心，往后换我护着你。"),
            Beat::Action("陆念离在刺客首领怀中翻出一枚令牌，令牌刻着幽阁标记"),
            Beat::Marked(Color::Blue, "令牌背面浮现一道血色纹路，转瞬消失"),
            Beat::MainQuest {
                description: "瓦解太子势力，护二姐一统百朝，终结乱世",
                progress: "0/10",
                reward: "六剑奴召唤权限",
            },
            SYSTEM_CHIME,
            Beat::System("主线任务已激活！"),
        ],
    }],
    hook: &[AuthoredScene {
        time: "夜",
        placement: Placement::Interior,
        location: "镇北王府·世子寝殿",
        beats: &[
            Beat::Warning("检测到暗黑气息", 3),
            Beat::Sound("嗡", "系统警报声"),
            Beat::Monologue("太子背后，还藏着别人。"),
            Beat::Marked(Color::Blue, "窗外月光照进寝殿，落在刺客尸体上"),
        ],
    }],
};

pub const SECOND: AuthoredEpisode = AuthoredEpisode {
    roster: &["陆念离", "百晓通", "六剑奴", "掌柜", "百晓堂护卫（数十名）"],
    cause: &[AuthoredScene {
        time: "日",
        placement: Placement::Interior,
        location: "镇北王府·世子寝殿",
        beats: &[
            Beat::Action("日，世子寝殿，桌案上摆着刺客留下的令牌"),
            Beat::Action("陆念离拿起一枚玉佩，玉佩背面刻着一个百字"),
            Beat::Monologue("百晓堂，掌控东土情报的组织。收服这股势力，主线才能推进。"),
            Beat::Action("陆念离召出苍生笔虚影"),
            Beat::Marked(Color::Green, "苍生笔虚影在空中画出百晓堂的暗道与密室"),
            line("陆念离", "画道通神，画物可知其形。"),
            Beat::Panel(
                Color::Green,
                "新手礼包隐藏奖励可解锁，消耗1000摆烂值，获得六剑奴召唤权限",
            ),
            SYSTEM_CHIME,
            Beat::Monologue("六剑奴，六人皆是金刚境。有他们在，收服百晓堂更有把握。"),
            Beat::Action("陆念离走出寝殿，朝王府大门走去"),
        ],
    }],
    process: &[AuthoredScene {
        time: "夜",
        placement: Placement::Interior,
        location: "长安·百晓堂",
        beats: &[
            Beat::Action("夜，长安城一处客栈，表面是客栈，实则是百晓堂总部"),
            line("掌柜", "客官住店还是吃饭？"),
            Beat::Action("陆念离掏出玉佩，放在柜台上"),
            line("陆念离", "我来找百晓通。"),
            Beat::Action("掌柜带陆念离穿过后院，推开一扇暗门"),
            Beat::Intro {
                name: "百晓通",
                action: "站在大厅中央，穿青衫，手持折扇",
                identity: "百晓堂首领，掌控东土情报网",
            },
            line("百晓通", "阁下何人？为何持有我百晓堂的令牌？"),
            line("陆念离", "镇北王世子，陆念离。我要百晓堂做我的情报网。"),
            cue("百晓通", "合上折扇", "世子未免太自信了。来人，送客！"),
            Beat::Action("数十名护卫拔刀，围向陆念离"),
            Beat::CombatSound("挥刀"),
            Beat::Marked(Color::Yellow, "陆念离抬手，六道黑影凭空出现，挡在陆念离身前"),
            Beat::Intro {
                name: "六剑奴",
                action: "戴青铜面具，身着黑色劲装",
                identity: "系统新手礼包势力，六人金刚境修为",
            },
            Beat::Marked(Color::Green, "剑气扫过，护卫手中长刀尽数断裂"),
            Beat::CombatSound("砍中"),
            Beat::Action("百晓通脸色惨白，后退两步，扑通一声跪下"),
            line("百晓通", "属下百晓通，愿归顺世子！"),
            Beat::TaskComplete {
                time_used: "一炷香",
                reward: "百晓堂初级情报网",
            },
        ],
    }],
    result: &[AuthoredScene {
        time: "夜",
        placement: Placement::Interior,
        location: "长安·百晓堂·密室",
        beats: &[
            Beat::Action("夜，百晓堂密室，地图铺展在桌上"),
            line("百晓通", "世子，太子朱峰联合皇后，准备在三日后的皇家狩猎上对您下手。"),
            line("陆念离", "他们打算怎么下手？"),
            line("百晓通", "太子安排了死士，伪装成猛兽，在狩猎场上袭击世子。"),
            Beat::Monologue("皇家狩猎，正好借机推进主线。"),
            Beat::Marked(Color::Blue, "陆念离手指敲击桌面，望向皇宫方向"),
            Beat::MainQuest {
                description: "瓦解太子势力，护二姐坐稳镇北军",
                progress: "1/10",
                reward: "百晓堂初级情报网",
            },
            SYSTEM_CHIME,
            line("陆念离", "继续盯着太子和皇后，有情况随时汇报。"),
            line("百晓通", "属下遵命。"),
        ],
    }],
    hook: &[AuthoredScene {
        time: "夜",
        placement: Placement::Interior,
        location: "镇北王府·世子寝殿",
        beats: &[
            Beat::Action("夜，世子寝殿，陆念离躺在床上，望着房梁"),
            Beat::Monologue("皇家狩猎，太子，皇后，幽阁。"),
            Beat::Warning("皇家狩猎暗藏杀机", 2),
            Beat::Marked(Color::Blue, "窗外月光照进寝殿，落在陆念离身上"),
        ],
    }],
};
