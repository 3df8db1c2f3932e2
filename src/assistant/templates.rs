//! Static message templates and the keyboards attached to them.

use std::path::PathBuf;

use teloxide::utils::html;
use tracing::debug;
use url::Url;

use crate::assistant::platform::{Button, Keyboard, Outgoing};

/// Callback payloads carried by inline buttons.
pub mod payload {
    pub const GIFT: &str = "gift";
    pub const CHECK_SUB: &str = "check_sub";
    pub const DOWNLOAD_GUIDE: &str = "download_guide";
    pub const COURSE: &str = "course";
    pub const SERVICES: &str = "services";
}

const WELCOME: &str = "Привет, <b>{name}</b>! 👋\n\n\
Меня зовут Полина, я помогаю экспертам и предпринимателям упаковывать суть бизнеса \
в аккуратный и заметный формат.\n\n\
В этом боте я собрала полезные материалы, которые помогут вам прокачать упаковку своего бизнеса.\n\n\
В меню ниже забирайте материалы и знакомьтесь с услугами!👇";

const GIFT: &str = "<b>{name}</b>, я подготовила подарок гайд <u><b><i>«Как с помощью продуманной \
упаковки привлекать подписчиков и клиентов».</i></b></u>\n\n\
✨<b><u><i>Что найдёте в гайде:</i></u></b>\n\
— разбор, что такое упаковка и зачем она нужна;\n\
— структуру сайта и соцсетей, которая понятна с первого экрана;\n\
— типовые ошибки, мешающие упаковке работать;\n\
— наглядную схему воронки продаж: от интереса до заявки;\n\
— финальный чек-лист, помогающий выявить слабые места.\n\n\
<b><u><i>Переходите по кнопке, чтобы читать гайд</i></u></b> 👇";

const SUBSCRIBE_PROMPT: &str = "Сначала подпишитесь на канал 👇";

const COURSE: &str =
    "⚡️ Мини-курс стартует скоро. Не выключайте уведомления в боте, чтобы не пропустить запуск!";

const SERVICES_HEADER: &str = "<b>Чем могу быть полезна:</b>\n";
const SERVICES_ITEMS: &[&str] = &[
    "➡️ Лендинги и многостраничные сайты на Tilda / Taplink",
    "➡️ Редизайн и развитие существующих сайтов",
    "➡️ Сайты-визитки для экспертов и компаниям",
    "➡️ Дизайн и верстка приглашений на любые мероприятия",
    "➡️ Инфографика и презентации для бизнеса",
    "➡️ Оформление и ведение Pinterest-профилей",
];
const SERVICES_FOOTER: &str = "\n\n<i>Свяжитесь со мной в личных сообщениях @Polina_Alex — обсудим, \
как лучше представить ваш проект.</i>";

const GUIDE_INTRO: &str = "По ссылке вас ждёт мой гайд о том, как с помощью продуманной упаковки \
привлекать подписчиков и клиентов.\n\n";
const GUIDE_OUTRO: &str = "\n<b>Забирайте и держите под рукой ⚡️</b>";

/// Name used in greetings when the user has neither a first name nor a username.
const FALLBACK_NAME: &str = "друг";

/// Named templates. Each one has a card image in the image directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Welcome,
    Gift,
    SubscribePrompt,
    Course,
    Services,
}

impl Template {
    pub fn name(self) -> &'static str {
        match self {
            Template::Welcome => "welcome",
            Template::Gift => "gift",
            Template::SubscribePrompt => "subscribe_prompt",
            Template::Course => "course",
            Template::Services => "services",
        }
    }

    fn image_file(self) -> &'static str {
        match self {
            Template::Welcome => "welcome.jpg",
            Template::Gift => "gift.jpg",
            Template::SubscribePrompt => "subscribe.jpg",
            Template::Course => "course.jpg",
            Template::Services => "services.jpg",
        }
    }
}

/// HTML-escaped display name: first name, then username, then a friendly default.
pub fn display_name(first_name: &str, username: Option<&str>) -> String {
    let name = Some(first_name.trim())
        .filter(|n| !n.is_empty())
        .or(username.filter(|u| !u.is_empty()))
        .unwrap_or(FALLBACK_NAME);
    html::escape(name)
}

pub struct Templates {
    image_dir: PathBuf,
    gift_url: Url,
    channel_invite_url: Url,
}

impl Templates {
    pub fn new(image_dir: PathBuf, gift_url: Url, channel_invite_url: Url) -> Self {
        Self { image_dir, gift_url, channel_invite_url }
    }

    /// The card image, if it is present on disk. Missing images degrade to a
    /// plain text message.
    fn image(&self, template: Template) -> Option<PathBuf> {
        let path = self.image_dir.join(template.image_file());
        if path.is_file() {
            Some(path)
        } else {
            debug!("No image for template {} at {:?}", template.name(), path);
            None
        }
    }

    fn card(&self, template: Template, text: String) -> Outgoing {
        Outgoing::text(text).with_image(self.image(template))
    }

    pub fn main_menu() -> Keyboard {
        Keyboard::column(vec![
            Button::callback("🎁 Подарок", payload::GIFT),
            Button::callback("📚 Мини-курс", payload::COURSE),
            Button::callback("💼 Услуги", payload::SERVICES),
        ])
    }

    /// `name` must already be escaped, see [`display_name`].
    pub fn welcome(&self, name: &str) -> Outgoing {
        self.card(Template::Welcome, WELCOME.replace("{name}", name))
            .with_keyboard(Self::main_menu())
    }

    /// `name` must already be escaped, see [`display_name`].
    pub fn gift(&self, name: &str) -> Outgoing {
        self.card(Template::Gift, GIFT.replace("{name}", name))
            .with_keyboard(Keyboard::column(vec![Button::callback(
                "🎁 Скачать гайд",
                payload::DOWNLOAD_GUIDE,
            )]))
    }

    pub fn subscribe_prompt(&self) -> Outgoing {
        self.card(Template::SubscribePrompt, SUBSCRIBE_PROMPT.to_string())
            .with_keyboard(Keyboard::column(vec![
                Button::url("🔗 Подписаться", self.channel_invite_url.clone()),
                Button::callback("✅ Готово", payload::CHECK_SUB),
            ]))
    }

    pub fn course(&self) -> Outgoing {
        self.card(Template::Course, COURSE.to_string())
    }

    pub fn services(&self) -> Outgoing {
        let items = SERVICES_ITEMS.join("\n");
        self.card(Template::Services, format!("{SERVICES_HEADER}\n{items}{SERVICES_FOOTER}"))
    }

    pub fn guide_link(&self) -> Outgoing {
        let href = html::escape(self.gift_url.as_str());
        let link = format!("<a href=\"{href}\">ССЫЛКА НА ГАЙД</a>\n");
        Outgoing::text(format!("{GUIDE_INTRO}{}{GUIDE_OUTRO}", link.repeat(3))).without_link_preview()
    }

    /// A channel post with a button that leads back to this bot.
    pub fn channel_post(text: &str, bot_link: Url) -> Outgoing {
        Outgoing::text(text).with_keyboard(Keyboard::column(vec![Button::url("🎁 Подарок", bot_link)]))
    }
}
